//! Integration tests for building a ClusterClient from kubeconfig files and
//! `.manifestctl.yaml`.

use std::fs;

use assert_matches::assert_matches;
use k8s_mock::HttpMockK8sServer;
use manifestctl::{
	client::{ClientOptions, ClusterClient, ConnectionError, ConnectionProfile},
	commands::util::ConnectionArgs,
	config::CONFIG_FILE_NAME,
	resource::ResourceKind,
};
use rstest::rstest;
use tempfile::TempDir;

#[tokio::test]
async fn test_connect_takes_namespace_from_context() {
	let server = HttpMockK8sServer::builder()
		.namespace("testyaml")
		.build()
		.start()
		.await;

	let client =
		ClusterClient::from_kubeconfig(server.kubeconfig(), None, ClientOptions::default())
			.await
			.expect("connection should succeed");

	assert_eq!(client.namespace(), "testyaml");
	assert!(client.cluster_identifier().contains("mock-context"));
	assert!(client.cluster_identifier().contains(&server.uri()));
}

#[tokio::test]
async fn test_explicit_namespace_wins_over_context() {
	let server = HttpMockK8sServer::builder().build().start().await;
	let options = ClientOptions::builder()
		.namespace("testyaml".to_string())
		.build();

	let client = ClusterClient::from_kubeconfig(server.kubeconfig(), Some("mock-context"), options)
		.await
		.unwrap();
	assert_eq!(client.namespace(), "testyaml");
}

#[tokio::test]
async fn test_unknown_context_is_rejected() {
	let server = HttpMockK8sServer::builder().build().start().await;

	let result = ClusterClient::from_kubeconfig(
		server.kubeconfig(),
		Some("staging"),
		ClientOptions::default(),
	)
	.await;
	assert_matches!(result, Err(ConnectionError::ContextNotFound(name)) if name == "staging");
	assert_eq!(server.request_count().await, 0);
}

#[rstest]
#[case::ca_not_base64(None, Some("%%% not base64 %%%"))]
#[case::ca_bad_pem(
	None,
	Some("LS0tLS1CRUdJTiBDRVJUSUZJQ0FURS0tLS0tCm5vdCBiYXNlNjQgYXQgYWxsIQotLS0tLUVORCBDRVJUSUZJQ0FURS0tLS0tCg==")
)]
#[case::server_not_a_url(Some("http://[::1"), None)]
#[tokio::test]
async fn test_malformed_auth_material_is_rejected(
	#[case] server_url: Option<&str>,
	#[case] ca_data: Option<&str>,
) {
	let server = HttpMockK8sServer::builder().build().start().await;
	let mut kubeconfig = server.kubeconfig();
	let cluster = kubeconfig.clusters[0].cluster.as_mut().unwrap();
	if let Some(url) = server_url {
		cluster.server = Some(url.to_string());
	}
	if let Some(data) = ca_data {
		cluster.certificate_authority_data = Some(data.to_string());
	}

	let result = ClusterClient::from_kubeconfig(kubeconfig, None, ClientOptions::default()).await;
	assert_matches!(
		result,
		Err(ConnectionError::Kubeconfig(_) | ConnectionError::Kube(_))
	);
	assert_eq!(server.request_count().await, 0);
}

#[tokio::test]
async fn test_connect_from_kubeconfig_file() {
	let server = HttpMockK8sServer::builder()
		.namespace("testyaml")
		.build()
		.start()
		.await;
	let temp = TempDir::new().unwrap();
	let path = temp.path().join("config");
	fs::write(
		&path,
		serde_yaml_with_quirks::to_string(&server.kubeconfig()).unwrap(),
	)
	.unwrap();

	let profile = ConnectionProfile {
		kubeconfig: Some(path),
		context: None,
	};
	let client = ClusterClient::connect(&profile, ClientOptions::default())
		.await
		.unwrap();

	let list = ResourceKind::Namespace.list(&client).await.unwrap();
	assert!(list.is_empty());
}

#[tokio::test]
async fn test_connect_through_config_file() {
	let server = HttpMockK8sServer::builder().build().start().await;
	let temp = TempDir::new().unwrap();
	fs::create_dir_all(temp.path().join("config")).unwrap();
	fs::write(
		temp.path().join("config/config"),
		serde_yaml_with_quirks::to_string(&server.kubeconfig()).unwrap(),
	)
	.unwrap();
	let config_path = temp.path().join(CONFIG_FILE_NAME);
	fs::write(
		&config_path,
		"kubeconfig: config/config\nnamespace: testyaml\npageSize: 7\n",
	)
	.unwrap();

	let args = ConnectionArgs {
		config: Some(config_path),
		..ConnectionArgs::default()
	};
	let client = args.connect(true).await.unwrap();

	assert_eq!(client.namespace(), "testyaml");
	assert_eq!(client.page_size(), 7);
	assert!(client.dry_run());
}
