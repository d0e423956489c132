//! Test environment with a scripted stand-in for `vg`
//!
//! The fake tool follows the real one's file contract: `chunk` writes the
//! region table to its `-E` argument, an annotation file (and with `-a` an
//! alignment chunk) into its working directory, and raw bytes to stdout;
//! `view -j -` turns stdin into a fixed JSON graph; `view -j -a` prints
//! JSON alignment records; `paths -X` prints path names.
//!
//! Region offsets and the frequency of path `x` echo the requested node id
//! (or coordinate range), so tests can tell which request produced what.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::util::ServiceExt;
use tubemap_common::config::TomlConfig;
use tubemap_server::{build_router, AppState};

/// Graph printed by the fake `vg view -j -`
pub const GRAPH_JSON: &str = r#"{"node":[{"id":1,"sequence":"ACGT"},{"id":2,"sequence":"T"}],"edge":[{"from":1,"to":2}],"path":[{"name":"x","mapping":[{"rank":1}]},{"name":"y"}]}"#;

/// How the fake `vg chunk` leaves the annotation side output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Annotation {
    Single,
    Missing,
    Ambiguous,
}

/// Behavior switches of the fake tool
#[derive(Debug, Clone)]
pub struct FakeVg {
    pub annotation: Annotation,
    pub chunk_exit: i32,
    pub chunk_sleep_secs: u32,
    pub alignment_exit: i32,
    pub paths_exit: i32,
    /// `chunk` writes its `-E` region table
    pub write_region_table: bool,
    /// `chunk -a` writes the alignment chunk
    pub write_alignment_chunk: bool,
}

impl Default for FakeVg {
    fn default() -> Self {
        Self {
            annotation: Annotation::Single,
            chunk_exit: 0,
            chunk_sleep_secs: 0,
            alignment_exit: 0,
            paths_exit: 0,
            write_region_table: true,
            write_alignment_chunk: true,
        }
    }
}

impl FakeVg {
    fn script(&self) -> String {
        let annotation = match self.annotation {
            Annotation::Single => r#"printf 'x %s\ny 0.5\n' "$tag" > chunk_0_annotate.txt"#.to_string(),
            Annotation::Missing => ":".to_string(),
            Annotation::Ambiguous => concat!(
                r#"printf 'x 1\ny 2\n' > chunk_0_annotate.txt; "#,
                r#"printf 'x 3\ny 4\n' > chunk_1_annotate.txt"#
            )
            .to_string(),
        };
        let regions = if self.write_region_table {
            r#"printf 'x\t%s\ny\t7\n' "$tag" > "$regions""#
        } else {
            ":"
        };
        let gam_chunk = if self.write_alignment_chunk {
            r#"if [ -n "$gam" ]; then printf 'GAM' > chunk_0.gam; fi"#
        } else {
            ":"
        };
        let sleep = if self.chunk_sleep_secs > 0 {
            format!("sleep {}", self.chunk_sleep_secs)
        } else {
            ":".to_string()
        };

        format!(
            r#"#!/bin/sh
sub="$1"
shift
case "$sub" in
chunk)
  regions=""; gam=""; node=""; range=""
  while [ $# -gt 0 ]; do
    case "$1" in
      -E) regions="$2"; shift ;;
      -a) gam="$2"; shift ;;
      -r) node="$2"; shift ;;
      -p) range="$2"; shift ;;
    esac
    shift
  done
  tag="${{node:-$range}}"
  {sleep}
  echo "chunking around $tag" >&2
  {regions}
  {annotation}
  {gam_chunk}
  printf 'VGBINARY'
  exit {chunk_exit}
  ;;
view)
  if [ "$2" = "-a" ]; then
    printf '{{"name":"read1","score":10}}\n{{"name":"read2","score":8}}\n'
    exit {alignment_exit}
  fi
  cat > /dev/null
  printf '%s' '{graph}'
  ;;
paths)
  printf 'x\ny\n'
  exit {paths_exit}
  ;;
*)
  echo "unknown subcommand $sub" >&2
  exit 2
  ;;
esac
"#,
            sleep = sleep,
            regions = regions,
            gam_chunk = gam_chunk,
            annotation = annotation,
            chunk_exit = self.chunk_exit,
            alignment_exit = self.alignment_exit,
            graph = GRAPH_JSON,
            paths_exit = self.paths_exit,
        )
    }
}

/// Data, work and tool directories for one test
pub struct TestEnv {
    pub root: TempDir,
    pub mounted: PathBuf,
    pub internal: PathBuf,
    pub work: PathBuf,
    pub vg: PathBuf,
    pub tool_timeout_secs: u64,
}

impl TestEnv {
    pub fn new(fake: &FakeVg) -> Self {
        let root = tempfile::tempdir().expect("Should create temp dir");
        let mounted = root.path().join("mountedData");
        let internal = root.path().join("internalData");
        let work = root.path().join("work");
        for dir in [&mounted, &internal, &work] {
            fs::create_dir_all(dir).unwrap();
        }

        fs::write(mounted.join("chr22.xg"), b"xg").unwrap();
        fs::write(mounted.join("reads.gam.index"), b"index").unwrap();
        fs::write(internal.join("internal.xg"), b"xg").unwrap();

        let vg = root.path().join("vg");
        fs::write(&vg, fake.script()).unwrap();
        fs::set_permissions(&vg, fs::Permissions::from_mode(0o755)).unwrap();

        Self {
            root,
            mounted,
            internal,
            work,
            vg,
            tool_timeout_secs: 30,
        }
    }

    pub fn config(&self) -> TomlConfig {
        TomlConfig {
            vg_path: self.vg.clone(),
            mounted_data_dir: self.mounted.clone(),
            internal_data_dir: self.internal.clone(),
            work_dir: self.work.clone(),
            tool_timeout_secs: self.tool_timeout_secs,
            ..TomlConfig::default()
        }
    }

    pub fn router(&self) -> Router {
        build_router(AppState::from_config(&self.config()))
    }

    /// Entries left in the work root
    pub fn leftovers(&self) -> Vec<PathBuf> {
        list(&self.work)
    }
}

fn list(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect()
}

/// POST a JSON body and return status plus parsed response body
pub async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let json = serde_json::from_slice(&bytes).expect("Should parse JSON");
    (status, json)
}

/// Region request around a node of the mounted `chr22.xg`
pub fn node_request(node_id: u64, gam_index: &str) -> Value {
    serde_json::json!({
        "nodeID": node_id.to_string(),
        "distance": "10",
        "xgFile": "chr22.xg",
        "gamIndex": gam_index,
        "anchorTrackName": "",
        "useMountedPath": "true",
        "byNode": "true"
    })
}

/// Switches the process working directory, restoring it on drop
pub struct CwdGuard {
    previous: PathBuf,
}

impl CwdGuard {
    pub fn enter(dir: &Path) -> Self {
        let previous = std::env::current_dir().expect("Should read current dir");
        std::env::set_current_dir(dir).expect("Should change current dir");
        Self { previous }
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.previous);
    }
}
