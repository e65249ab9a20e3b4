#![cfg(unix)]

use anyhow::{Context, Result};
use pretty_assertions::assert_eq;
use scout_engine::{Engine, EngineConfig, EngineGateway};
use scout_mcp::guard::{ConsistencyGuard, GuardState};
use scout_search::{BoostPlan, SearchPipeline};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const CART: &str = "app/code/Vendor/Checkout/Model/Cart.php";

/// Serves searches only over the persistent channel; one-shot search is refused, so a
/// successful search proves the reopened channel answered it. Every launch is logged.
fn write_engine(dir: &Path, journal: &Path) -> Result<PathBuf> {
    let script = format!(
        r#"#!/bin/sh
echo "$1" >> '{journal}'
case "$1" in
  serve)
    echo '{{"ready":true}}'
    n=0
    while IFS= read -r line; do
      n=$((n+1))
      echo "{{\"id\":\"req-$n\",\"ok\":true,\"data\":{{\"results\":[{{\"path\":\"{CART}\",\"distance\":0.1}}]}}}}"
    done
    ;;
  stats)
    echo '{{"total_records":0}}'
    ;;
  index)
    echo 'Indexing 2 files'
    echo '{{"indexed_files":2}}'
    ;;
  *)
    echo "one-shot $1 is not available" >&2
    exit 2
    ;;
esac
"#,
        journal = journal.display()
    );
    let path = dir.join("engine");
    std::fs::write(&path, script).context("write engine script")?;
    let mut perms = std::fs::metadata(&path)?.permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).context("chmod engine script")?;
    Ok(path)
}

fn launches(journal: &Path) -> Vec<String> {
    std::fs::read_to_string(journal)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn rebuild_reopens_the_persistent_channel_for_search() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let journal = tmp.path().join("launches.log");
    let db_path = tmp.path().join("index.db");
    std::fs::write(&db_path, vec![0u8; 8 * 1024])?;

    let config = EngineConfig::new(
        write_engine(tmp.path(), &journal)?,
        &db_path,
        tmp.path().join("models"),
    )
    .with_ready_timeout(Duration::from_secs(5));
    let gateway = Arc::new(EngineGateway::new(config));
    assert!(gateway.start().await, "serve process never became ready");

    let engine: Arc<dyn Engine> = gateway.clone();
    let pipeline = Arc::new(SearchPipeline::new(Arc::clone(&engine)));
    let guard = ConsistencyGuard::new(
        Arc::clone(&engine),
        Arc::clone(&pipeline),
        &db_path,
        tmp.path(),
    );

    let rebuild = guard.check().await.context("expected a rebuild to start")?;
    rebuild.await?;
    assert_eq!(guard.state(), GuardState::Compatible);
    assert_eq!(guard.last_error(), None);
    assert!(!db_path.exists());
    assert!(engine.persistent_ready());
    assert_eq!(launches(&journal), ["serve", "stats", "index", "serve"]);

    let ranked = tokio::time::timeout(
        Duration::from_secs(5),
        pipeline.search("checkout cart", 5, &BoostPlan::default()),
    )
    .await
    .context("search timed out")??;
    assert_eq!(ranked[0].hit.path, CART);
    assert_eq!(pipeline.cache_len(), 1);

    engine.shutdown().await;
    Ok(())
}
