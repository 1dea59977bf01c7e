#![allow(dead_code)]

use async_trait::async_trait;
use raftwarden::{AdminChannel, AdminError, CmdOutput, ManagedDatabase, DB_NORTH};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SERVER_ADDRESS: &str = "ssl:10.1.1.185:9643";
pub const FULL_SID: &str = "87f0d686-8a8d-4585-9513-45efac449101";
pub const STALE_SID: &str = "3936";
pub const UNKNOWN_SIDS: [&str; 2] = ["c10c", "fc43"];
pub const KNOWN_MEMBERS: &str = "ssl:10.1.1.185:9643,ssl:10.1.1.218:9643,ssl:10.1.1.211:9643";

pub const SERVERS: &str = "Servers:
    87f0 (87f0 at ssl:10.1.1.185:9643) (self)
    bbf6 (bbf6 at ssl:10.1.1.218:9643) last msg 2757 ms ago
    ad31 (ad31 at ssl:10.1.1.211:9643) last msg 153868958 ms ago";

pub const STALE_SERVERS: &str = "Servers:
    87f0 (87f0 at ssl:10.1.1.185:9643) (self)
    3936 (3936 at ssl:10.1.1.185:9643) last msg 153868958 ms ago
    bbf6 (bbf6 at ssl:10.1.1.218:9643) last msg 2757 ms ago
    ad31 (ad31 at ssl:10.1.1.211:9643) last msg 153868958 ms ago";

pub const UNKNOWN_SERVERS: &str = "Servers:
    87f0 (87f0 at ssl:10.1.1.185:9643) (self)
    c10c (c10c at ssl:10.1.1.219:9643) last msg 2757 ms ago
    fc43 (fc43 at ssl:10.1.1.220:9643) last msg 2123 ms ago
    bbf6 (bbf6 at ssl:10.1.1.218:9643) last msg 1543 ms ago
    ad31 (ad31 at ssl:10.1.1.211:9643) last msg 153868958 ms ago";

/// Render a cluster-status report the way the engine prints one.
pub fn status_report(address: &str, role: &str, timer: &str, servers: &str) -> String {
    format!(
        "87f0
Name: Northbound
Cluster ID: f832 (f832bbff-e28c-4656-83f0-075e91a7ab8f)
Server ID: 87f0 ({FULL_SID})
Address: {address}
Status: cluster member
Role: {role}
Term: 4
Leader: bbf6
Vote: unknown

Election timer: {timer}
Log: [19418, 26772]
Entries not yet committed: 0
Entries not yet applied: 0
Connections: ->bbf6 ->ad31 <-bbf6 <-ad31
Disconnections: 1
{servers}"
    )
}

struct MockRes {
    stdout: String,
    stderr: String,
    fail: bool,
}

/// Admin channel returning canned responses keyed by the joined argument
/// list, recording every call it receives. Unconfigured commands fail.
pub struct MockChannel {
    responses: Mutex<HashMap<String, MockRes>>,
    calls: Mutex<Vec<String>>,
}

impl MockChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn key(args: &[&str]) -> String {
        args.join(" ")
    }

    pub fn ok(&self, args: &[&str], stdout: &str) {
        self.responses.lock().unwrap().insert(
            Self::key(args),
            MockRes {
                stdout: stdout.to_string(),
                stderr: String::new(),
                fail: false,
            },
        );
    }

    pub fn fail(&self, args: &[&str], stderr: &str) {
        self.responses.lock().unwrap().insert(
            Self::key(args),
            MockRes {
                stdout: String::new(),
                stderr: stderr.to_string(),
                fail: true,
            },
        );
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }
}

#[async_trait]
impl AdminChannel for MockChannel {
    async fn execute(&self, _timeout: Duration, args: &[String]) -> Result<CmdOutput, AdminError> {
        let key = args.join(" ");
        self.calls.lock().unwrap().push(key.clone());

        let responses = self.responses.lock().unwrap();
        match responses.get(&key) {
            Some(res) if res.fail => Err(AdminError::Failed {
                args: args.to_vec(),
                stderr: res.stderr.clone(),
            }),
            Some(res) => Ok(CmdOutput {
                stdout: res.stdout.clone(),
                stderr: res.stderr.clone(),
            }),
            None => Err(AdminError::Failed {
                args: args.to_vec(),
                stderr: format!("unexpected command: {}", key),
            }),
        }
    }
}

pub fn test_db(channel: Arc<MockChannel>) -> ManagedDatabase {
    ManagedDatabase {
        name: DB_NORTH.to_string(),
        alias: "nbdb".to_string(),
        db_file: PathBuf::from("nbdb.db"),
        election_timer: 1000,
        status_failures: 0,
        call_timeout: Duration::from_secs(5),
        channel,
    }
}
