//! Catalog mocks and a shell-script stand-in for innoextract

use std::path::{Path, PathBuf};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mount a product response for `id` on `server`
pub async fn mount_product(server: &MockServer, id: &str, title: &str, release_date: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/products/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": id,
            "title": title,
            "release_date": release_date,
        })))
        .mount(server)
        .await;
}

/// Make every product lookup fail with `status`
pub async fn mount_status(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// How the fake innoextract behaves
pub struct FakeTool {
    pub game_id: Option<String>,
    pub payload_exit_code: i32,
    pub payload_sleep_secs: u64,
}

impl FakeTool {
    pub fn with_id(id: &str) -> Self {
        Self {
            game_id: Some(id.to_string()),
            payload_exit_code: 0,
            payload_sleep_secs: 0,
        }
    }
}

/// Write an executable `/bin/sh` script that mimics innoextract
///
/// `--gog-game-id` prints the ID line; payload mode writes `app/game.exe`,
/// `app/data/readme.txt` and an empty `app/data/empty.dat` into `--output-dir`.
#[cfg(unix)]
pub fn write_fake_tool(dir: &Path, tool: &FakeTool) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let id_line = match &tool.game_id {
        Some(id) => format!("echo \"GOG.com game ID is {id}\""),
        None => "echo \"$2: not a GOG installer\" >&2".to_string(),
    };
    let sleep_line = if tool.payload_sleep_secs > 0 {
        format!("exec sleep {}", tool.payload_sleep_secs)
    } else {
        String::new()
    };
    let failure_lines = if tool.payload_exit_code != 0 {
        format!(
            "echo \"error: checksum mismatch\" >&2\nexit {}",
            tool.payload_exit_code
        )
    } else {
        String::new()
    };

    let script = format!(
        r#"#!/bin/sh
if [ "$1" = "--gog-game-id" ]; then
  {id_line}
  exit 0
fi
out=""
while [ $# -gt 0 ]; do
  case "$1" in
    --output-dir) out="$2"; shift 2 ;;
    *) shift ;;
  esac
done
{sleep_line}
{failure_lines}
mkdir -p "$out/app/data"
printf 'payload' > "$out/app/game.exe"
printf 'read me' > "$out/app/data/readme.txt"
: > "$out/app/data/empty.dat"
exit 0
"#
    );

    let path = dir.join("innoextract");
    std::fs::write(&path, script).expect("Failed to write fake tool");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("Failed to make fake tool executable");
    path
}
