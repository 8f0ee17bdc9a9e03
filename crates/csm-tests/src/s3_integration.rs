//! Image manifest resolution through a scripted `radosgw-admin` and a mock S3 endpoint.

use crate::harness::{image_manifest, radosgw_script, Gateway, Reply, ScriptedRunner};
use csm_common::CommandError;
use csm_s3::{get_s3_image_info, Radosgw, S3Error, S3Object};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_image_info_end_to_end() {
    let gateway = Gateway::start().await;
    gateway
        .mount_manifest("boot-images", "img-new", image_manifest("img-new"))
        .await;
    let runner = Arc::new(radosgw_script(ScriptedRunner::new(), "boot-images", "IMS"));

    let images = get_s3_image_info(
        Radosgw::new(runner.clone()),
        "boot-images",
        "img-new",
        &gateway.uri(),
    )
    .await
    .unwrap();
    assert_eq!(images.rootfs, "s3://boot-images/img-new/rootfs");
    assert_eq!(images.kernel, "s3://boot-images/img-new/kernel");
    assert_eq!(images.initrd, "s3://boot-images/img-new/initrd");

    let calls = runner.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0], ["radosgw-admin", "bucket", "list", "--bucket", "boot-images"]);
    assert_eq!(
        calls[1],
        ["radosgw-admin", "object", "stat", "--object", "img-new/manifest.json", "--bucket", "boot-images"]
    );
    assert_eq!(calls[2], ["radosgw-admin", "user", "info", "--uid", "IMS"]);
}

#[tokio::test]
async fn test_missing_bucket_stops_before_lookup() {
    let runner = Arc::new(ScriptedRunner::new().on(
        &["radosgw-admin", "bucket", "list"],
        vec![Reply::fail(2, "could not init bucket info for bucket=boot-images")],
    ));

    let err = get_s3_image_info(
        Radosgw::new(runner.clone()),
        "boot-images",
        "img-new",
        "http://127.0.0.1:9",
    )
    .await
    .unwrap_err();
    match err {
        S3Error::Command(CommandError::Failed { code, stderr, .. }) => {
            assert_eq!(code, 2);
            assert!(stderr.contains("boot-images"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(runner.count(&["radosgw-admin", "object"]), 0);
}

#[tokio::test]
async fn test_manifest_without_rootfs() {
    let gateway = Gateway::start().await;
    let manifest = json!({
        "artifacts": [
            {"type": "application/vnd.cray.image.kernel", "link": {"path": "s3://boot-images/x/kernel"}},
            {"type": "application/vnd.cray.image.initrd", "link": {"path": "s3://boot-images/x/initrd"}}
        ]
    });
    gateway.mount_manifest("boot-images", "x", manifest).await;
    let runner = Arc::new(radosgw_script(ScriptedRunner::new(), "boot-images", "IMS"));

    let err = get_s3_image_info(Radosgw::new(runner), "boot-images", "x", &gateway.uri())
        .await
        .unwrap_err();
    assert!(matches!(err, S3Error::MissingImage("rootfs")), "{:?}", err);
    assert_eq!(err.to_string(), "ERROR could not find image for rootfs");
}

#[tokio::test]
async fn test_owner_and_keys_looked_up_once() {
    let gateway = Gateway::start().await;
    gateway
        .mount_manifest("boot-images", "img-new", image_manifest("img-new"))
        .await;
    let runner = Arc::new(radosgw_script(ScriptedRunner::new(), "boot-images", "IMS"));

    let mut object = S3Object::new(Radosgw::new(runner.clone()), "boot-images", "img-new/manifest.json")
        .await
        .unwrap();
    object.get_object(&gateway.uri()).await.unwrap();
    object.get_object(&gateway.uri()).await.unwrap();

    assert_eq!(runner.count(&["radosgw-admin", "object", "stat"]), 1);
    assert_eq!(runner.count(&["radosgw-admin", "user", "info"]), 1);
}
