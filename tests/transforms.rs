mod common;

use std::fs;

use tempfile::tempdir;

use assetpipe::pipeline::copy::CopyTransform;
use assetpipe::pipeline::page::PageTransform;
use assetpipe::pipeline::script::ScriptTransform;
use assetpipe::pipeline::style::StyleTransform;
use assetpipe::pipeline::{include, BuildMode, Category, Transform};
use assetpipe::watch::CategorySources;

use common::{init_tracing, spec, write_file};

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn include_directives_expand_recursively() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let root = dir.path();
    write_file(&root.join("partials/header.html"), "<header>\n//= nav.html\n</header>");
    write_file(&root.join("partials/nav.html"), "<nav>links</nav>");

    let expanded = include::expand("<body>\n//= partials/header.html\n</body>", root)?;

    assert!(expanded.contains("<header>"));
    assert!(expanded.contains("<nav>links</nav>"));
    assert!(!expanded.contains("//="));
    Ok(())
}

#[test]
fn css_block_directives_expand_too() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let root = dir.path();
    write_file(&root.join("partials/reset.css"), "* { margin: 0; }");

    let expanded = include::expand("/*= partials/reset.css */\nbody { color: red; }", root)?;

    assert!(expanded.contains("* { margin: 0; }"));
    assert!(expanded.contains("body { color: red; }"));
    Ok(())
}

#[test]
fn missing_include_names_the_offending_path() {
    init_tracing();

    let dir = tempdir().unwrap();
    let err = include::expand("//= partials/nope.html\n", dir.path()).unwrap_err();
    assert!(format!("{err:#}").contains("nope.html"), "{err:#}");
}

#[test]
fn include_cycles_are_detected() {
    init_tracing();

    let dir = tempdir().unwrap();
    let root = dir.path();
    write_file(&root.join("a.js"), "//= b.js\n");
    write_file(&root.join("b.js"), "//= a.js\n");

    let err = include::expand("//= a.js\n", root).unwrap_err();
    assert!(format!("{err:#}").contains("cycle"), "{err:#}");
}

#[test]
fn page_transform_assembles_entries_into_dest() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let root = dir.path().canonicalize()?;
    write_file(
        &root.join("app/index.html"),
        "<body>\n//= templates/header.html\n</body>",
    );
    write_file(&root.join("app/templates/header.html"), "<h1>hello</h1>");

    let html_spec = spec("app/*.html", "build", "app/**/*.html");
    let sources = CategorySources::from_spec(Category::Html, &html_spec, &root)?;
    let transform = PageTransform::new(sources, root.join("build"));

    let output = transform.run(&[root.join("app/index.html")])?;
    assert_eq!(output.outputs, vec![root.join("build/index.html")]);

    let built = fs::read_to_string(root.join("build/index.html"))?;
    assert!(built.contains("<h1>hello</h1>"));
    Ok(())
}

#[test]
fn changed_include_rebuilds_every_page() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let root = dir.path().canonicalize()?;
    write_file(&root.join("app/one.html"), "//= templates/header.html\n");
    write_file(&root.join("app/two.html"), "//= templates/header.html\n");
    write_file(&root.join("app/templates/header.html"), "<h1>v1</h1>");

    let html_spec = spec("app/*.html", "build", "app/**/*.html");
    let sources = CategorySources::from_spec(Category::Html, &html_spec, &root)?;
    let transform = PageTransform::new(sources, root.join("build"));

    // The changed file is the include, not an entry: both pages rebuild.
    write_file(&root.join("app/templates/header.html"), "<h1>v2</h1>");
    let output = transform.run(&[root.join("app/templates/header.html")])?;
    assert_eq!(output.outputs.len(), 2);

    for page in ["one.html", "two.html"] {
        let built = fs::read_to_string(root.join("build").join(page))?;
        assert!(built.contains("v2"), "{page} should carry the new include");
    }
    Ok(())
}

#[test]
fn script_transform_checks_syntax_in_development() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let root = dir.path().canonicalize()?;
    write_file(&root.join("app/js/main.js"), "//= lib/util.js\nconsole.log(add(1, 2));\n");
    write_file(
        &root.join("app/js/lib/util.js"),
        "function add(a, b) { return a + b; }\n",
    );

    let js_spec = spec("app/js/*.js", "build/js", "app/**/*.js");
    let sources = CategorySources::from_spec(Category::Js, &js_spec, &root)?;
    let transform = ScriptTransform::new(sources, root.join("build/js"), BuildMode::Development);

    transform.run(&[root.join("app/js/main.js")])?;
    let built = fs::read_to_string(root.join("build/js/main.js"))?;
    assert!(built.contains("function add"), "development output stays readable");

    // Broken syntax is a diagnosable failure, not silent passthrough.
    write_file(&root.join("app/js/main.js"), "function {\n");
    let err = transform.run(&[root.join("app/js/main.js")]).unwrap_err();
    assert_eq!(err.category(), Category::Js);
    assert!(err.file().is_some());
    Ok(())
}

#[test]
fn script_transform_minifies_in_production() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let root = dir.path().canonicalize()?;
    write_file(
        &root.join("app/js/main.js"),
        "function add(first, second) {\n    return first + second;\n}\nconsole.log(add(1, 2));\n",
    );

    let js_spec = spec("app/js/*.js", "build/js", "app/**/*.js");
    let sources = CategorySources::from_spec(Category::Js, &js_spec, &root)?;
    let transform = ScriptTransform::new(sources, root.join("build/js"), BuildMode::Production);

    transform.run(&[root.join("app/js/main.js")])?;
    let source_len = fs::read_to_string(root.join("app/js/main.js"))?.len();
    let built = fs::read_to_string(root.join("build/js/main.js"))?;
    assert!(!built.is_empty());
    assert!(built.len() < source_len, "minified output should shrink");
    Ok(())
}

#[test]
fn style_transform_bundles_the_entry_stylesheet() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let root = dir.path().canonicalize()?;
    write_file(
        &root.join("app/css/styles.css"),
        "/*= partials/reset.css */\nbody { color: red; }\n",
    );
    write_file(&root.join("app/css/partials/reset.css"), "* { margin: 0; }\n");

    let style_spec = spec("app/css/styles.css", "build/css", "app/**/*.css");
    let sources = CategorySources::from_spec(Category::Style, &style_spec, &root)?;
    let transform = StyleTransform::new(sources, root.join("build/css"), BuildMode::Development);

    // Any watched css change rebuilds the bundle.
    transform.run(&[root.join("app/css/partials/reset.css")])?;

    let built = fs::read_to_string(root.join("build/css/styles.css"))?;
    assert!(built.contains("margin: 0"));
    assert!(built.contains("color: red"));
    Ok(())
}

#[test]
fn style_transform_minifies_in_production() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let root = dir.path().canonicalize()?;
    write_file(
        &root.join("app/css/styles.css"),
        "body {\n    color: red;\n    margin: 0px;\n}\n",
    );

    let style_spec = spec("app/css/styles.css", "build/css", "app/**/*.css");
    let sources = CategorySources::from_spec(Category::Style, &style_spec, &root)?;
    let transform = StyleTransform::new(sources, root.join("build/css"), BuildMode::Production);

    transform.run(&[root.join("app/css/styles.css")])?;
    let built = fs::read_to_string(root.join("build/css/styles.css"))?;
    assert!(!built.contains('\n') || built.lines().count() <= 1, "minified: {built:?}");
    Ok(())
}

#[test]
fn copy_transform_preserves_relative_layout() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let root = dir.path().canonicalize()?;
    write_file(&root.join("app/assets/img/icons/star.svg"), "<svg/>");

    let img_spec = spec(
        "app/assets/img/**/*.*",
        "build/img",
        "app/assets/img/**/*.*",
    );
    let sources = CategorySources::from_spec(Category::Image, &img_spec, &root)?;
    let transform = CopyTransform::new(sources, root.join("build/img"));

    let output = transform.run(&[root.join("app/assets/img/icons/star.svg")])?;
    assert_eq!(output.outputs, vec![root.join("build/img/icons/star.svg")]);
    assert!(root.join("build/img/icons/star.svg").is_file());
    Ok(())
}

#[test]
fn missing_include_is_a_file_level_transform_error() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let root = dir.path().canonicalize()?;
    write_file(&root.join("app/index.html"), "//= templates/gone.html\n");

    let html_spec = spec("app/*.html", "build", "app/**/*.html");
    let sources = CategorySources::from_spec(Category::Html, &html_spec, &root)?;
    let transform = PageTransform::new(sources, root.join("build"));

    let err = transform.run(&[root.join("app/index.html")]).unwrap_err();
    assert_eq!(err.category(), Category::Html);
    assert_eq!(err.file(), Some(root.join("app/index.html").as_path()));
    assert!(err.to_string().contains("gone.html"), "{err}");
    Ok(())
}
