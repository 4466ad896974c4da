use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

/// Command isolated from the user's config, cache and environment
fn foliocache(temp: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("foliocache"));
    cmd.arg("--config")
        .arg(temp.join("config.yaml"))
        .arg("--cache-dir")
        .arg(temp.join("cache"))
        .env_remove("FOLIOCACHE_CONFIG")
        .env_remove("FOLIOCACHE_CACHE_DIR")
        .env_remove("FOLIOCACHE_ORIGIN")
        .env_remove("FOLIOCACHE_FORMAT")
        .env_remove("FOLIOCACHE_DEBUG")
        .env_remove("RUST_LOG");
    cmd
}

fn json_stdout(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn version_prints_package_version() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    foliocache(temp.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn classify_reports_strategy_table() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let assert = foliocache(temp.path())
        .args([
            "classify",
            "/app.js",
            "https://fonts.googleapis.com/css2?family=Inter",
            "/api/data.json",
            "--format",
            "json",
        ])
        .assert()
        .success();

    let json = json_stdout(assert.get_output());
    let data = &json["data"];

    assert_eq!(data[0]["class"], "static");
    assert_eq!(data[0]["strategy"], "cache_first");
    assert_eq!(data[0]["cache"], "portfolio-static-v2.0.0");
    assert_eq!(data[0]["ttl_secs"], 7 * 24 * 3600);

    assert_eq!(data[1]["strategy"], "stale_while_revalidate");
    assert!(data[1]["ttl_secs"].is_null());

    assert_eq!(data[2]["strategy"], "network_first");
    Ok(())
}

#[test]
fn classify_respects_configured_version() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    fs::write(temp.path().join("config.yaml"), "cache_version: v3.1.0\n")?;

    foliocache(temp.path())
        .args(["classify", "/images/me.png", "--format", "table"])
        .assert()
        .success()
        .stdout(predicate::str::contains("portfolio-images-v3.1.0"));
    Ok(())
}

#[test]
fn status_uses_custom_config_path() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let config_path = temp.path().join("config.yaml");
    fs::write(&config_path, "origin: https://portfolio.example\n")?;

    let assert = foliocache(temp.path()).arg("status").assert().success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(stdout.contains("Origin: https://portfolio.example"));
    assert!(stdout.contains(&config_path.to_string_lossy().to_string()));
    Ok(())
}

#[test]
fn init_with_origin_writes_config() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;

    foliocache(temp.path())
        .args(["init", "--origin", "https://portfolio.example"])
        .assert()
        .success();

    let saved = fs::read_to_string(temp.path().join("config.yaml"))?;
    assert!(saved.contains("origin: https://portfolio.example/"));
    assert!(saved.contains("cache_version: v2.0.0"));
    Ok(())
}

#[test]
fn fetch_relative_url_without_origin_fails() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;

    foliocache(temp.path())
        .args(["fetch", "/app.js"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no site origin"));
    Ok(())
}

#[test]
fn cache_path_honours_override() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let expected = temp.path().join("cache");

    foliocache(temp.path())
        .args(["cache", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(expected.to_string_lossy().to_string()));
    Ok(())
}

#[test]
fn completion_generates_script() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;

    foliocache(temp.path())
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("foliocache"));
    Ok(())
}

#[cfg_attr(not(feature = "http-tests"), ignore)]
#[test]
fn fetch_static_asset_hits_network_once() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let origin = server.url();

    let asset = server
        .mock("GET", "/app.js")
        .with_status(200)
        .with_header("content-type", "application/javascript")
        .with_body("console.log('hi')")
        .expect(1)
        .create();

    let temp = tempdir()?;

    let first = foliocache(temp.path())
        .args(["fetch", "/app.js", "--origin", &origin, "--format", "json"])
        .assert()
        .success();
    assert_eq!(json_stdout(first.get_output())["data"]["served_from"], "network");

    let second = foliocache(temp.path())
        .args(["fetch", "/app.js", "--origin", &origin, "--format", "json"])
        .assert()
        .success();
    let json = json_stdout(second.get_output());
    assert_eq!(json["data"]["served_from"], "cache");
    assert!(json["data"]["cached_at"].is_i64());

    asset.assert();
    Ok(())
}

#[cfg_attr(not(feature = "http-tests"), ignore)]
#[test]
fn fetch_body_to_stdout() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let origin = server.url();
    let _page = server
        .mock("GET", "/index.html")
        .with_status(200)
        .with_body("<h1>Portfolio</h1>")
        .create();

    let temp = tempdir()?;
    foliocache(temp.path())
        .args(["fetch", "/index.html", "--origin", &origin, "--out", "-"])
        .assert()
        .success()
        .stdout("<h1>Portfolio</h1>");
    Ok(())
}

#[cfg_attr(not(feature = "http-tests"), ignore)]
#[test]
fn network_first_failure_without_cache_is_error() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let origin = server.url();
    let _api = server
        .mock("GET", "/api/data.json")
        .with_status(500)
        .create();

    let temp = tempdir()?;
    foliocache(temp.path())
        .args(["fetch", "/api/data.json", "--origin", &origin])
        .assert()
        .failure()
        .stderr(predicate::str::contains("500"));
    Ok(())
}

#[cfg_attr(not(feature = "http-tests"), ignore)]
#[test]
fn cache_first_offline_serves_503() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let origin = server.url();
    let _missing = server
        .mock("GET", "/styles.css")
        .with_status(502)
        .create();

    let temp = tempdir()?;
    let assert = foliocache(temp.path())
        .args(["fetch", "/styles.css", "--origin", &origin, "--format", "json"])
        .assert()
        .success();

    let json = json_stdout(assert.get_output());
    assert_eq!(json["data"]["served_from"], "offline");
    assert_eq!(json["data"]["status"], 503);
    assert_eq!(json["data"]["degradations"][0]["kind"], "network_failed");
    Ok(())
}

#[cfg_attr(not(feature = "http-tests"), ignore)]
#[test]
fn cache_status_and_clear() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let origin = server.url();
    let _img = server
        .mock("GET", "/images/me.png")
        .with_status(200)
        .with_body("png-bytes")
        .create();

    let temp = tempdir()?;
    foliocache(temp.path())
        .args(["fetch", "/images/me.png", "--origin", &origin])
        .assert()
        .success();

    let status = foliocache(temp.path())
        .args(["cache", "status", "--format", "json"])
        .assert()
        .success();
    let json = json_stdout(status.get_output());
    assert_eq!(json["data"][0]["name"], "portfolio-images-v2.0.0");
    assert_eq!(json["data"][0]["entries"], 1);

    let clear = foliocache(temp.path())
        .args(["cache", "clear", "--yes", "--format", "json"])
        .assert()
        .success();
    assert_eq!(json_stdout(clear.get_output())["data"]["caches_removed"], 1);

    foliocache(temp.path())
        .args(["cache", "status", "--format", "table"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No results found."));
    Ok(())
}

#[cfg_attr(not(feature = "http-tests"), ignore)]
#[test]
fn cache_preload_reports_partial_failure() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let origin = server.url();
    let _root = server.mock("GET", "/").with_status(200).with_body("home").create();
    let _js = server.mock("GET", "/app.js").with_status(200).with_body("js").create();
    let _css = server.mock("GET", "/styles.css").with_status(404).create();

    let temp = tempdir()?;
    fs::write(
        temp.path().join("config.yaml"),
        format!("origin: {}\ncritical_urls: ['/', '/app.js', '/styles.css']\n", origin),
    )?;

    let assert = foliocache(temp.path())
        .args(["cache", "preload", "--format", "json"])
        .assert()
        .success();

    let json = json_stdout(assert.get_output());
    assert_eq!(json["data"]["stored"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["data"]["failed"][0]["url"], format!("{}/styles.css", origin));
    Ok(())
}

#[cfg_attr(not(feature = "http-tests"), ignore)]
#[test]
fn image_negotiates_webp_when_sibling_exists() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let origin = server.url();
    let _webp = server
        .mock("HEAD", "/images/me.webp")
        .with_status(200)
        .create();

    let temp = tempdir()?;
    let assert = foliocache(temp.path())
        .args([
            "image",
            "/images/me.jpg",
            "--origin",
            &origin,
            "--accept",
            "image/webp,image/*",
            "--format",
            "json",
        ])
        .assert()
        .success();

    let json = json_stdout(assert.get_output());
    assert_eq!(json["data"]["format"], "webp");
    assert_eq!(json["data"]["element"]["src"], "/images/me.webp");
    assert_eq!(json["data"]["element"]["loading"], "lazy");
    assert!(
        json["data"]["element"]["srcset"]
            .as_str()
            .is_some_and(|s| s.starts_with("/images/me-480w.webp 480w"))
    );
    Ok(())
}
