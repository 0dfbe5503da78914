//! Tests for manifest augmentation over a mock manifest tree
//!
//! These tests lay out service directories in a temporary root the way the
//! benchmark's kubernetes/ directory is organised.

#[cfg(test)]
mod manifest_tree_tests {
    use crate::error::BenchError;
    use crate::manifest::{augment, parse_documents, scan_manifest_files, AugmentOptions};
    use crate::models::MetricSelection;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const FRONTEND_DEPLOYMENT: &str = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: frontend-deployment
  labels:
    service: frontend
spec:
  replicas: 1
  template:
    spec:
      containers:
      - name: frontend
"#;

    const FRONTEND_SERVICE: &str = r#"apiVersion: v1
kind: Service
metadata:
  name: frontend
spec:
  ports:
  - port: 5000
"#;

    const MONGODB_DEPLOYMENT: &str = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: mongodb-geo
  labels:
    io.kompose.service: mongodb-geo
spec:
  template:
    spec:
      containers:
      - name: hotel-reserv-geo-mongo
"#;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn cpu_only() -> AugmentOptions {
        AugmentOptions::with_metrics(MetricSelection::new(true, false))
    }

    #[test]
    fn test_frontend_scenario() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "frontend/frontend-deployment.yaml", FRONTEND_DEPLOYMENT);

        let result = augment(temp_dir.path(), &cpu_only()).unwrap();

        assert_eq!(result.workloads, ["frontend"]);
        assert_eq!(result.documents.len(), 2);

        let deployment = &result.documents[0];
        let resources = &deployment["spec"]["template"]["spec"]["containers"][0]["resources"];
        assert_eq!(resources["requests"]["cpu"], "500m");
        assert_eq!(resources["requests"]["memory"], "128Mi");
        assert_eq!(resources["limits"]["cpu"], "1000m");
        assert_eq!(resources["limits"]["memory"], "256Mi");

        let hpa = &result.documents[1];
        assert_eq!(hpa["kind"], "HorizontalPodAutoscaler");
        assert_eq!(hpa["metadata"]["name"], "frontend");
        assert_eq!(hpa["spec"]["minReplicas"], 1);
        assert_eq!(hpa["spec"]["maxReplicas"], 10);
        assert_eq!(hpa["spec"]["metrics"][0]["resource"]["name"], "cpu");
        assert_eq!(
            hpa["spec"]["metrics"][0]["resource"]["target"]["averageUtilization"],
            50
        );
    }

    #[test]
    fn test_excluded_service_gets_no_autoscaler() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "geo/mongodb-deployment.yaml", MONGODB_DEPLOYMENT);

        let result = augment(temp_dir.path(), &cpu_only()).unwrap();

        assert!(result.workloads.is_empty());
        assert_eq!(result.policies, 0);
        assert_eq!(result.documents.len(), 1);
        // Defaults still apply to excluded workloads
        assert_eq!(
            result.documents[0]["spec"]["template"]["spec"]["containers"][0]["resources"]
                ["limits"]["memory"],
            "256Mi"
        );
    }

    #[test]
    fn test_no_metrics_means_no_autoscalers() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "frontend/frontend-deployment.yaml", FRONTEND_DEPLOYMENT);
        write(temp_dir.path(), "frontend/frontend-service.yaml", FRONTEND_SERVICE);

        let result = augment(temp_dir.path(), &AugmentOptions::default()).unwrap();

        assert!(result.workloads.is_empty());
        assert_eq!(result.policies, 0);
        assert_eq!(result.documents.len(), 2);
        assert_eq!(result.defaults_filled, 4);
    }

    #[test]
    fn test_only_primary_workload_files_get_autoscalers() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "frontend/frontend-service.yaml", FRONTEND_SERVICE);
        write(
            temp_dir.path(),
            "frontend/frontend-canary.yaml",
            &FRONTEND_DEPLOYMENT.replace("frontend-deployment", "frontend-canary"),
        );

        let result = augment(temp_dir.path(), &cpu_only()).unwrap();

        assert_eq!(result.policies, 0);
        assert_eq!(result.files_scanned, 2);
    }

    #[test]
    fn test_first_workload_per_file_only() {
        let temp_dir = TempDir::new().unwrap();
        let second = FRONTEND_DEPLOYMENT.replace("service: frontend", "service: second");
        write(
            temp_dir.path(),
            "frontend/frontend-deployment.yaml",
            &format!("{FRONTEND_SERVICE}---\n{FRONTEND_DEPLOYMENT}---\n{second}"),
        );

        let result = augment(temp_dir.path(), &cpu_only()).unwrap();

        assert_eq!(result.workloads, ["frontend"]);
        assert_eq!(result.documents.len(), 4);
        assert_eq!(result.documents[3]["kind"], "HorizontalPodAutoscaler");
        // Both workloads still receive defaults
        assert_eq!(result.defaults_filled, 8);
    }

    #[test]
    fn test_autoscaler_follows_its_source_file() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "frontend/frontend-deployment.yaml", FRONTEND_DEPLOYMENT);
        write(temp_dir.path(), "frontend/frontend-service.yaml", FRONTEND_SERVICE);
        write(
            temp_dir.path(),
            "search/search-deployment.yaml",
            &FRONTEND_DEPLOYMENT.replace("service: frontend", "io.kompose.service: search"),
        );

        let result = augment(temp_dir.path(), &cpu_only()).unwrap();

        let kinds: Vec<_> = result
            .documents
            .iter()
            .map(|d| d["kind"].as_str().unwrap())
            .collect();
        assert_eq!(
            kinds,
            [
                "Deployment",
                "HorizontalPodAutoscaler",
                "Service",
                "Deployment",
                "HorizontalPodAutoscaler"
            ]
        );
        assert_eq!(result.workloads, ["frontend", "search"]);
    }

    #[test]
    fn test_reserved_directory_and_other_files_skipped() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "scripts/tool-deployment.yaml", FRONTEND_DEPLOYMENT);
        write(temp_dir.path(), "frontend/README.md", "not a manifest");
        write(temp_dir.path(), "frontend/frontend-deployment.yaml", FRONTEND_DEPLOYMENT);
        write(temp_dir.path(), "top-level.yaml", FRONTEND_SERVICE);

        let files = scan_manifest_files(temp_dir.path(), "scripts").unwrap();

        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("frontend/frontend-deployment.yaml"));
    }

    #[test]
    fn test_duplicate_workload_name_gets_one_autoscaler() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "frontend/frontend-deployment.yaml", FRONTEND_DEPLOYMENT);
        write(temp_dir.path(), "frontend-v2/frontend-deployment.yaml", FRONTEND_DEPLOYMENT);

        let result = augment(temp_dir.path(), &cpu_only()).unwrap();

        assert_eq!(result.workloads, ["frontend"]);
        assert_eq!(result.policies, 1);
        let autoscalers = result
            .documents
            .iter()
            .filter(|doc| doc["kind"] == "HorizontalPodAutoscaler")
            .count();
        assert_eq!(autoscalers, 1);
        // Both Deployments are still emitted
        assert_eq!(result.documents.len(), 3);
    }

    #[test]
    fn test_commented_out_file_adds_no_documents() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "frontend/frontend-service.yaml", FRONTEND_SERVICE);
        write(
            temp_dir.path(),
            "frontend/frontend-ingress.yaml",
            "# ingress disabled\n# kind: Ingress\n",
        );
        write(temp_dir.path(), "frontend/empty.yaml", "");

        let result = augment(temp_dir.path(), &cpu_only()).unwrap();

        assert_eq!(result.files_scanned, 3);
        assert_eq!(result.documents.len(), 1);
        assert!(!result.render().unwrap().contains("null"));
    }

    #[test]
    fn test_malformed_document_aborts() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "a/a-deployment.yaml", FRONTEND_DEPLOYMENT);
        write(temp_dir.path(), "b/b-service.yaml", "kind: Service\n  spec: [broken\n");

        let err = augment(temp_dir.path(), &cpu_only()).unwrap_err();

        match err {
            BenchError::Parse { path, .. } => assert!(path.ends_with("b/b-service.yaml")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_root_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");

        assert!(matches!(
            augment(&missing, &cpu_only()),
            Err(BenchError::Io { .. })
        ));
    }

    #[test]
    fn test_written_artifact_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "frontend/frontend-deployment.yaml", FRONTEND_DEPLOYMENT);
        write(temp_dir.path(), "frontend/frontend-service.yaml", FRONTEND_SERVICE);
        write(temp_dir.path(), "geo/mongodb-deployment.yaml", MONGODB_DEPLOYMENT);

        let result = augment(
            temp_dir.path(),
            &AugmentOptions::with_metrics(MetricSelection::new(true, true)),
        )
        .unwrap();
        let output = temp_dir.path().join("hpa_config.yaml");
        result.write_to(&output).unwrap();

        let reparsed = parse_documents(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(reparsed.len(), 3 + result.policies);
        assert_eq!(result.policies, 1);
        assert_eq!(reparsed, result.documents);

        let metrics = reparsed[1]["spec"]["metrics"].as_sequence().unwrap();
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[1]["resource"]["name"], "memory");
    }

    #[test]
    fn test_augmenting_augmented_output_fills_nothing() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "frontend/frontend-deployment.yaml", FRONTEND_DEPLOYMENT);

        let first = augment(temp_dir.path(), &AugmentOptions::default()).unwrap();
        let rendered = first.render().unwrap();

        let again = TempDir::new().unwrap();
        write(again.path(), "frontend/frontend-deployment.yaml", &rendered);
        let second = augment(again.path(), &AugmentOptions::default()).unwrap();

        assert_eq!(first.defaults_filled, 4);
        assert_eq!(second.defaults_filled, 0);
        assert_eq!(second.documents, first.documents);
    }
}
