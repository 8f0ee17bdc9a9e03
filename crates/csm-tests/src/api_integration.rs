//! Gateway clients against a mock API gateway.

use crate::harness::{boot_record, Gateway, StaticSecrets, TOKEN};
use csm_api::{ApiError, ApiSession, Auth, BssClient, HsmClient, RoleSubrole, SlsClient};
use csm_cli::merge_xnames;
use csm_common::{BootImages, CsmConfig};

fn new_images() -> BootImages {
    BootImages {
        kernel: "s3://boot-images/img-new/kernel".to_string(),
        initrd: "s3://boot-images/img-new/initrd".to_string(),
        rootfs: "s3://boot-images/img-new/rootfs".to_string(),
    }
}

#[tokio::test]
async fn test_token_from_secret_opens_session() {
    let gateway = Gateway::start().await;
    gateway.mount_token().await;
    gateway
        .mount_components(RoleSubrole::ManagementMaster, &["x3000c0s1b0n0"])
        .await;

    let store = StaticSecrets::admin_client(&gateway.token_endpoint());
    let mut auth = Auth::new(Box::new(store), &CsmConfig::default()).unwrap();
    auth.refresh_token().await.unwrap();
    assert_eq!(auth.token().unwrap(), TOKEN);

    let session = ApiSession::with_token(gateway.uri(), auth.token().unwrap()).unwrap();
    let xnames = HsmClient::new(&session)
        .get_xnames(RoleSubrole::ManagementMaster)
        .await
        .unwrap();
    assert_eq!(xnames, ["x3000c0s1b0n0"]);
}

#[tokio::test]
async fn test_wrong_token_is_rejected() {
    let gateway = Gateway::start().await;
    gateway
        .mount_components(RoleSubrole::ManagementWorker, &["x3000c0s4b0n0"])
        .await;

    let session = ApiSession::with_token(gateway.uri(), "stale").unwrap();
    let err = HsmClient::new(&session)
        .get_xnames(RoleSubrole::ManagementWorker)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Status { .. }), "{:?}", err);
}

#[tokio::test]
async fn test_sls_lookups_both_directions() {
    let gateway = Gateway::start().await;
    gateway
        .mount_management_hardware(&[
            ("x3000c0s1b0n0", "ncn-m001"),
            ("x3000c0s4b0n0", "ncn-w001"),
        ])
        .await;

    let session = gateway.session();
    let sls = SlsClient::new(&session);
    assert_eq!(sls.get_xname("ncn-w001").await.unwrap(), "x3000c0s4b0n0");
    assert_eq!(sls.get_hostname("x3000c0s1b0n0").await.unwrap(), "ncn-m001");
    assert!(sls.get_xname("ncn-s009").await.is_err());
}

#[tokio::test]
async fn test_set_image_on_role_and_explicit_nodes() {
    let gateway = Gateway::start().await;
    gateway.mount_bss().await;
    gateway
        .mount_components(
            RoleSubrole::ManagementWorker,
            &["x3000c0s4b0n0", "x3000c0s5b0n0"],
        )
        .await;
    for xname in ["x3000c0s4b0n0", "x3000c0s5b0n0", "x3000c0s9b0n0"] {
        gateway.bss.insert(xname, boot_record(xname, "img-old"));
    }

    let session = gateway.session();
    let discovered = HsmClient::new(&session)
        .get_xnames(RoleSubrole::ManagementWorker)
        .await
        .unwrap();
    let targets = merge_xnames(
        discovered,
        &["x3000c0s5b0n0".to_string(), "x3000c0s9b0n0".to_string()],
    );
    assert_eq!(targets, ["x3000c0s4b0n0", "x3000c0s5b0n0", "x3000c0s9b0n0"]);

    let updates = BssClient::new(&session)
        .set_image(&targets, &new_images())
        .await
        .unwrap();
    assert_eq!(updates.len(), 3);
    for update in &updates {
        assert_eq!(update.rootfs, "s3://boot-images/img-new/rootfs");
        assert_eq!(update.kernel, "s3://boot-images/img-new/kernel");
        assert_eq!(update.initrd, "s3://boot-images/img-new/initrd");

        let stored = gateway.bss.get(&update.xname).unwrap();
        let params = stored["params"].as_str().unwrap();
        assert!(!params.contains("img-old"));
        assert_eq!(stored["cloud-init"]["user-data"]["hostname"], update.xname.as_str());
    }
}

#[tokio::test]
async fn test_set_image_stops_at_unknown_node() {
    let gateway = Gateway::start().await;
    gateway.mount_bss().await;
    gateway
        .bss
        .insert("x3000c0s4b0n0", boot_record("x3000c0s4b0n0", "img-old"));

    let session = gateway.session();
    let targets = ["x3000c0s4b0n0".to_string(), "x9999c0s0b0n0".to_string()];
    let err = BssClient::new(&session)
        .set_image(&targets, &new_images())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)), "{:?}", err);

    let patched = gateway.bss.get("x3000c0s4b0n0").unwrap();
    assert!(patched["kernel"].as_str().unwrap().contains("img-new"));
}
