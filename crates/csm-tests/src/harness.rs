//! Test doubles shared by the integration suites.

use async_trait::async_trait;
use csm_api::bss::BOOTPARAMS_PATH;
use csm_api::hsm::COMPONENTS_PATH;
use csm_api::sls::{MANAGEMENT_ROLE_QUERY, SEARCH_HARDWARE_PATH};
use csm_api::{ApiSession, AuthError, RoleSubrole, SecretStore};
use csm_common::{CommandOutput, CommandRunner};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const TOKEN: &str = "integration_token";
pub const TOKEN_PATH: &str = "/keycloak/realms/shasta/protocol/openid-connect/token";

/// One canned process result.
#[derive(Debug, Clone)]
pub struct Reply {
    pub stdout: String,
    pub stderr: String,
    pub code: i32,
}

impl Reply {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            code: 0,
        }
    }

    pub fn fail(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            code,
        }
    }
}

/// Answers commands by argument prefix. Replies for a prefix are consumed in
/// order and the last one repeats; the longest matching prefix wins.
#[derive(Default)]
pub struct ScriptedRunner {
    scripts: Mutex<Vec<(Vec<String>, VecDeque<Reply>)>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, prefix: &[&str], replies: Vec<Reply>) -> Self {
        let prefix = prefix.iter().map(|s| s.to_string()).collect();
        self.scripts
            .lock()
            .unwrap()
            .push((prefix, replies.into_iter().collect()));
        self
    }

    pub fn reply(self, prefix: &[&str], stdout: impl Into<String>) -> Self {
        self.on(prefix, vec![Reply::ok(stdout)])
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded calls starting with `prefix`.
    pub fn count(&self, prefix: &[&str]) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.len() >= prefix.len() && call.iter().zip(prefix).all(|(a, b)| a == b))
            .count()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, args: &[&str]) -> CommandOutput {
        self.calls
            .lock()
            .unwrap()
            .push(args.iter().map(|a| a.to_string()).collect());

        let mut scripts = self.scripts.lock().unwrap();
        let matched = scripts
            .iter_mut()
            .filter(|(prefix, _)| {
                prefix.len() <= args.len() && prefix.iter().zip(args).all(|(p, a)| p == a)
            })
            .max_by_key(|(prefix, _)| prefix.len());

        let reply = match matched {
            Some((_, replies)) if replies.len() > 1 => replies.pop_front(),
            Some((_, replies)) => replies.front().cloned(),
            None => None,
        }
        .unwrap_or_else(|| Reply::fail(127, format!("no script for {:?}", args)));
        CommandOutput::new(args, reply.stdout, reply.stderr, reply.code)
    }
}

/// Secret store backed by a fixed map.
pub struct StaticSecrets(pub BTreeMap<String, Vec<u8>>);

impl StaticSecrets {
    pub fn admin_client(endpoint: &str) -> Self {
        let mut data = BTreeMap::new();
        data.insert("client-id".to_string(), b"admin-client".to_vec());
        data.insert("client-secret".to_string(), b"s3cr3t\n".to_vec());
        data.insert("endpoint".to_string(), endpoint.as_bytes().to_vec());
        Self(data)
    }
}

#[async_trait]
impl SecretStore for StaticSecrets {
    async fn read_secret(
        &self,
        _name: &str,
        _namespace: &str,
    ) -> Result<BTreeMap<String, Vec<u8>>, AuthError> {
        Ok(self.0.clone())
    }
}

/// In-memory BSS: GET answers with the records named in the body's `hosts`,
/// PATCH replaces the stored record.
#[derive(Default)]
pub struct BssState {
    records: Mutex<HashMap<String, Value>>,
}

impl BssState {
    pub fn insert(&self, xname: &str, record: Value) {
        self.records.lock().unwrap().insert(xname.to_string(), record);
    }

    pub fn get(&self, xname: &str) -> Option<Value> {
        self.records.lock().unwrap().get(xname).cloned()
    }
}

struct BssResponder(Arc<BssState>);

impl Respond for BssResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(_) => return ResponseTemplate::new(400),
        };
        let hosts: Vec<String> = body["hosts"]
            .as_array()
            .map(|hosts| {
                hosts
                    .iter()
                    .filter_map(|h| h.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        if request.method.as_str() == "PATCH" {
            for host in &hosts {
                self.0.insert(host, body.clone());
            }
            return ResponseTemplate::new(200);
        }
        let found: Vec<Value> = hosts.iter().filter_map(|h| self.0.get(h)).collect();
        ResponseTemplate::new(200).set_body_json(found)
    }
}

/// Mock API gateway, token endpoint and radosgw S3 endpoint on one server.
pub struct Gateway {
    pub server: MockServer,
    pub bss: Arc<BssState>,
}

impl Gateway {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
            bss: Arc::new(BssState::default()),
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn token_endpoint(&self) -> String {
        format!("{}{}", self.server.uri(), TOKEN_PATH)
    }

    pub fn session(&self) -> ApiSession {
        ApiSession::with_token(self.server.uri(), TOKEN).expect("http client")
    }

    pub async fn mount_token(&self) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": TOKEN,
                "token_type": "Bearer",
                "expires_in": 300
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_components(&self, role_subrole: RoleSubrole, ids: &[&str]) {
        let components: Vec<Value> = ids
            .iter()
            .map(|id| json!({"ID": id, "Type": "Node", "State": "Ready"}))
            .collect();
        Mock::given(method("GET"))
            .and(path(COMPONENTS_PATH))
            .and(header("Authorization", format!("Bearer {}", TOKEN).as_str()))
            .and(query_param("role", role_subrole.role()))
            .and(query_param("subrole", role_subrole.subrole()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Components": components })))
            .mount(&self.server)
            .await;
    }

    /// Serves SLS management hardware as `(xname, alias)` pairs.
    pub async fn mount_management_hardware(&self, nodes: &[(&str, &str)]) {
        let hardware: Vec<Value> = nodes
            .iter()
            .map(|(xname, alias)| {
                json!({
                    "Parent": "x3000c0s1b0",
                    "Xname": xname,
                    "Type": "comptype_node",
                    "ExtraProperties": {"Role": "Management", "Aliases": [alias]}
                })
            })
            .collect();
        Mock::given(method("GET"))
            .and(path(SEARCH_HARDWARE_PATH))
            .and(query_param(MANAGEMENT_ROLE_QUERY.0, MANAGEMENT_ROLE_QUERY.1))
            .respond_with(ResponseTemplate::new(200).set_body_json(hardware))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_bss(&self) {
        for verb in ["GET", "PATCH"] {
            Mock::given(method(verb))
                .and(path(BOOTPARAMS_PATH))
                .and(header("Authorization", format!("Bearer {}", TOKEN).as_str()))
                .respond_with(BssResponder(self.bss.clone()))
                .mount(&self.server)
                .await;
        }
    }

    /// Path-style S3 GET of `{bucket}/{image_id}/manifest.json`.
    pub async fn mount_manifest(&self, bucket: &str, image_id: &str, manifest: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/{}/{}/manifest.json", bucket, image_id)))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "application/json")
                    .set_body_string(manifest.to_string()),
            )
            .mount(&self.server)
            .await;
    }
}

/// BSS record for a node currently booting `image`.
pub fn boot_record(xname: &str, image: &str) -> Value {
    let rootfs = format!("s3://boot-images/{}/rootfs", image);
    json!({
        "hosts": [xname],
        "params": format!(
            "console=ttyS0,115200 metal.server={} root=live:LABEL=SQFSRAID rd.live.squashimg={}",
            rootfs, rootfs
        ),
        "kernel": format!("s3://boot-images/{}/kernel", image),
        "initrd": format!("s3://boot-images/{}/initrd", image),
        "cloud-init": {"user-data": {"hostname": xname}}
    })
}

/// IMS manifest listing the three boot artifacts of `image`.
pub fn image_manifest(image: &str) -> Value {
    json!({
        "version": "1.0",
        "created": "2023-05-01 12:00:00",
        "artifacts": [
            {
                "type": "application/vnd.cray.image.rootfs.squashfs",
                "link": {"path": format!("s3://boot-images/{}/rootfs", image), "type": "s3"}
            },
            {
                "type": "application/vnd.cray.image.kernel",
                "link": {"path": format!("s3://boot-images/{}/kernel", image), "type": "s3"}
            },
            {
                "type": "application/vnd.cray.image.initrd",
                "link": {"path": format!("s3://boot-images/{}/initrd", image), "type": "s3"}
            }
        ]
    })
}

/// `radosgw-admin` replies for an object owned by `uid` in `bucket`.
pub fn radosgw_script(runner: ScriptedRunner, bucket: &str, uid: &str) -> ScriptedRunner {
    runner
        .reply(&["radosgw-admin", "bucket", "list", "--bucket", bucket], "[]")
        .reply(
            &["radosgw-admin", "object", "stat"],
            json!({"name": "manifest.json", "policy": {"acl": {}, "owner": {"id": uid, "display_name": uid}}})
                .to_string(),
        )
        .reply(
            &["radosgw-admin", "user", "info", "--uid", uid],
            json!({"user_id": uid, "keys": [{"user": uid, "access_key": "AKIAIMS", "secret_key": "ims-secret"}]})
                .to_string(),
        )
}

/// `ceph orch ps --format json` output with one daemon per `(version, status)`.
pub fn daemons(entries: &[(&str, &str)]) -> String {
    let list: Vec<Value> = entries
        .iter()
        .enumerate()
        .map(|(i, (version, status))| {
            json!({"daemon_id": format!("ncn-s00{}", i + 1), "version": version, "status_desc": status})
        })
        .collect();
    Value::Array(list).to_string()
}
