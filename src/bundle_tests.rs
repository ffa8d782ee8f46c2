#[cfg(test)]
mod tests {
    use crate::bundle::{
        build_bundle_source, fingerprint, normalize_base_url, rewrite_dynamic_imports,
        strip_export_statements, BUNDLE_BASE_BINDING,
    };
    use crate::config::BundleConfig;
    use crate::error::WidgetError;
    use std::path::{Path, PathBuf};

    fn fixture_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata/bundle")
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url(Path::new("/srv/bundle")), "file:///srv/bundle/");
        assert_eq!(normalize_base_url(Path::new("/srv/bundle/")), "file:///srv/bundle/");
    }

    #[test]
    fn test_rewrites_relative_dynamic_imports() {
        let source = r#"a = import('./chunk-2.js'); b = import( "../shared/x.js");"#;
        let rewritten = rewrite_dynamic_imports(source);
        assert_eq!(
            rewritten,
            format!(
                "a = import(new URL('./chunk-2.js', {base}).href); b = import(new URL('../shared/x.js', {base}).href);",
                base = BUNDLE_BASE_BINDING
            )
        );
    }

    #[test]
    fn test_leaves_bare_and_mismatched_imports() {
        for source in [
            "import('react')",
            "import('https://cdn.example/x.js')",
            r#"import('./broken.js")"#,
            "import(specifier)",
        ] {
            assert_eq!(rewrite_dynamic_imports(source), source);
        }
    }

    #[test]
    fn test_strips_only_export_lists() {
        let source = "const a = 1;\nexport { a as default, b };\n  export {c}\nexport const keep = 2;\n";
        let stripped = strip_export_statements(source);
        assert!(!stripped.contains("export {"));
        assert!(!stripped.contains("export{"));
        assert!(stripped.contains("const a = 1;"));
        assert!(stripped.contains("export const keep = 2;"));
    }

    #[test]
    fn test_build_from_fixture() {
        let config = BundleConfig {
            bundle_dir: fixture_dir(),
            ..BundleConfig::default()
        };
        let source = build_bundle_source(&config).unwrap();
        let expected_base = normalize_base_url(&fixture_dir());

        assert!(source.starts_with(&format!(
            "const {} = \"{}\";\n",
            BUNDLE_BASE_BINDING, expected_base
        )));
        assert!(source.contains("function createElement"));
        assert!(source.contains("window.__MARKETPLACE_WIDGET_PREVIEW = preview;"));
        assert!(source.contains(&format!(
            "import(new URL('./locales/en.js', {}).href)",
            BUNDLE_BASE_BINDING
        )));
        assert!(!source.contains("export {"));
    }

    #[test]
    fn test_base_dir_override() {
        let config = BundleConfig {
            bundle_dir: fixture_dir(),
            bundle_files: vec!["index-chunk-1.js".to_string()],
            bundle_base_dir: Some(PathBuf::from("/cdn/assets")),
        };
        let source = build_bundle_source(&config).unwrap();
        assert!(source.starts_with(&format!(
            "const {} = \"file:///cdn/assets/\";",
            BUNDLE_BASE_BINDING
        )));
    }

    #[test]
    fn test_absolute_chunk_paths_bypass_bundle_dir() {
        let absolute = fixture_dir().join("index-chunk-1.js");
        let config = BundleConfig {
            bundle_dir: PathBuf::from("/does/not/exist"),
            bundle_files: vec![absolute.to_string_lossy().into_owned()],
            bundle_base_dir: None,
        };
        assert!(build_bundle_source(&config).is_ok());
    }

    #[test]
    fn test_missing_chunk_reports_path() {
        let config = BundleConfig {
            bundle_dir: fixture_dir(),
            bundle_files: vec!["missing.js".to_string()],
            bundle_base_dir: None,
        };
        match build_bundle_source(&config) {
            Err(err @ WidgetError::Io { .. }) => {
                assert_eq!(err.kind(), "BundleInitializationError");
                assert!(err.to_string().contains("missing.js"));
            }
            other => panic!("expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let a = fingerprint("bundle");
        assert_eq!(a, fingerprint("bundle"));
        assert_ne!(a, fingerprint("bundle2"));
        assert_eq!(a.len(), 64);
    }
}
