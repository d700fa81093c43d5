mod common;

use std::path::PathBuf;

use tempfile::tempdir;

use assetpipe::config::{load_and_validate, load_settings, resolve_settings, ConfigFile, Settings};
use assetpipe::pipeline::Category;

use common::{init_tracing, write_file};

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn empty_config_yields_builtin_layout() -> TestResult {
    init_tracing();

    let cfg: ConfigFile = toml::from_str("")?;
    let settings = resolve_settings(&cfg)?;

    assert_eq!(settings.serve.port, 9000);
    assert_eq!(settings.paths.spec(Category::Html).src, "app/*.html");
    assert_eq!(
        settings.paths.spec(Category::Js).dest,
        PathBuf::from("build/js")
    );
    // The assets category excludes the image subtree so the two never write
    // the same output path.
    assert!(settings.paths.spec(Category::Assets).exclude.is_some());
    Ok(())
}

#[test]
fn category_overrides_replace_fields_not_categories() -> TestResult {
    init_tracing();

    let cfg: ConfigFile = toml::from_str(
        r#"
        [serve]
        port = 8080

        [category.js]
        src = "frontend/js/*.js"
        dest = "public/js"
        "#,
    )?;
    let settings = resolve_settings(&cfg)?;

    let js = settings.paths.spec(Category::Js);
    assert_eq!(js.src, "frontend/js/*.js");
    assert_eq!(js.dest, PathBuf::from("public/js"));
    // Unset fields keep their builtin values.
    assert_eq!(js.watch, "app/**/*.js");

    // Untouched categories are fully intact.
    assert_eq!(settings.paths.spec(Category::Style).src, "app/css/styles.css");
    assert_eq!(settings.serve.port, 8080);
    Ok(())
}

#[test]
fn unknown_category_is_a_startup_error() {
    init_tracing();

    let cfg: ConfigFile = toml::from_str(
        r#"
        [category.fonts]
        src = "app/fonts/*.woff2"
        "#,
    )
    .unwrap();

    let err = resolve_settings(&cfg).unwrap_err();
    assert!(format!("{err:#}").contains("fonts"), "{err:#}");
}

#[test]
fn bad_globs_and_server_sections_fail_fast() {
    init_tracing();

    let cfg: ConfigFile = toml::from_str(
        r#"
        [category.html]
        src = "app/[*.html"
        "#,
    )
    .unwrap();
    assert!(resolve_settings(&cfg).is_err());

    let cfg: ConfigFile = toml::from_str(
        r#"
        [serve]
        port = 9000
        reload_port = 9000
        "#,
    )
    .unwrap();
    assert!(resolve_settings(&cfg).is_err());

    let cfg: ConfigFile = toml::from_str(
        r#"
        [category.style]
        watch = ""
        "#,
    )
    .unwrap();
    assert!(resolve_settings(&cfg).is_err());
}

#[test]
fn explicit_config_path_must_exist() {
    init_tracing();

    let dir = tempdir().unwrap();
    let missing = dir.path().join("Nope.toml");
    assert!(load_settings(Some(missing.as_path())).is_err());
}

#[test]
fn config_file_loads_from_disk() -> TestResult {
    init_tracing();

    let dir = tempdir().unwrap();
    let path = dir.path().join("Assetpipe.toml");
    write_file(
        &path,
        r#"
        [serve]
        host = "0.0.0.0"
        port = 3000
        "#,
    );

    let settings = load_and_validate(&path)?;
    assert_eq!(settings.serve.host, "0.0.0.0");
    assert_eq!(settings.serve.port, 3000);
    Ok(())
}

#[test]
fn default_settings_match_builtin_table() {
    init_tracing();

    let settings = Settings::default();
    for (category, spec) in settings.paths.iter() {
        assert!(!spec.src.is_empty(), "{category} src");
        assert!(!spec.watch.is_empty(), "{category} watch");
        assert!(!spec.dest.as_os_str().is_empty(), "{category} dest");
    }
}
