#![cfg(unix)]

use pharmatrain_training::{
    JobConfig, JobDefinition, JobKind, JobRegistry, JobRunner, JobStatus, NullProgressSink,
    Orchestrator, ProjectLayout, TrainingError, report,
};
use std::path::Path;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const SCRIPTS: [(JobKind, &str, &str); 3] = [
    (JobKind::DrugClassifier, "drug.sh", "echo \"drug epoch 1\"\necho \"args: $*\"\nexit 0\n"),
    (
        JobKind::AuthenticityVerifier,
        "auth.sh",
        "echo \"loading pairs\"\necho \"out of memory\" >&2\nexit 1\n",
    ),
    (JobKind::PillDetector, "pill.sh", "echo \"detector ready\"\n"),
];

fn config_name(kind: JobKind) -> String {
    format!("{}_config.json", kind.as_str())
}

fn scaffold(root: &Path) -> (ProjectLayout, JobRegistry) {
    let layout = ProjectLayout::new(root.to_path_buf());
    std::fs::create_dir_all(layout.scripts_dir()).unwrap();
    std::fs::create_dir_all(layout.configs_dir()).unwrap();
    std::fs::create_dir_all(layout.data_dir()).unwrap();

    let mut definitions = Vec::new();
    for (kind, script, body) in SCRIPTS {
        std::fs::write(layout.scripts_dir().join(script), body).unwrap();
        let config = JobConfig::default_for(kind).to_json_pretty().unwrap();
        std::fs::write(layout.configs_dir().join(config_name(kind)), config).unwrap();
        definitions.push(JobDefinition::new(kind, script, &config_name(kind)));
    }
    (layout, JobRegistry::new("sh", definitions))
}

#[tokio::test]
async fn failing_middle_job_is_isolated() {
    let temp = TempDir::new().unwrap();
    let (layout, registry) = scaffold(temp.path());
    let names = registry.names();

    let mut orch = Orchestrator::new(layout.clone(), registry, JobRunner::new());
    let prereqs = orch.check_prerequisites(&names).unwrap();
    assert_eq!(prereqs.warnings.len(), 2, "image class directories are absent");

    let summary = orch.run(None, &NullProgressSink, &CancellationToken::new()).await;
    assert_eq!(summary.completed, vec!["drug_classifier", "pill_detector"]);
    assert_eq!(summary.failed, vec!["authenticity_verifier"]);
    assert!(!summary.success());

    let generated = report::generate(orch.session(), chrono::Utc::now());
    let verifier = &generated.models["authenticity_verifier"];
    assert_eq!(verifier.status, JobStatus::Failed);
    assert_eq!(verifier.error.as_deref(), Some("Process exited with code 1"));
    assert_eq!(generated.models["drug_classifier"].status, JobStatus::Completed);
    assert_eq!(generated.models["pill_detector"].status, JobStatus::Completed);

    let path = report::write_report(&generated, &layout.training_dir()).unwrap();
    assert!(path.exists());

    let failed_log = std::fs::read_to_string(layout.job_log_path("authenticity_verifier")).unwrap();
    assert!(failed_log.contains(" - loading pairs"));
    assert!(failed_log.contains(" - out of memory"));

    let drug_log = std::fs::read_to_string(layout.job_log_path("drug_classifier")).unwrap();
    let args_line = drug_log.lines().find(|l| l.contains("args:")).unwrap();
    assert!(args_line.contains("--config"));
    assert!(args_line.contains("--data"));
    let output_dir = layout.job_output_dir("drug_classifier");
    assert!(args_line.contains(&format!("--output {}", output_dir.display())));
}

#[tokio::test]
async fn missing_config_blocks_the_run() {
    let temp = TempDir::new().unwrap();
    let (layout, registry) = scaffold(temp.path());
    std::fs::remove_file(layout.configs_dir().join(config_name(JobKind::PillDetector))).unwrap();

    let orch = Orchestrator::new(layout, registry, JobRunner::new());
    let err = orch.check_prerequisites(&["pill_detector".to_string()]).unwrap_err();
    match err {
        TrainingError::Prerequisite(errors) => {
            assert_eq!(errors.len(), 1);
            assert!(errors[0].contains("pill_detector_config.json"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(orch.session().jobs().iter().all(|j| j.status == JobStatus::Pending));
}

#[tokio::test]
async fn timeout_fails_only_the_hung_job() {
    let temp = TempDir::new().unwrap();
    let (layout, registry) = scaffold(temp.path());
    std::fs::write(layout.scripts_dir().join("drug.sh"), "sleep 30\n").unwrap();

    let runner = JobRunner::new().with_timeout(Some(std::time::Duration::from_millis(300)));
    let mut orch = Orchestrator::new(layout, registry, runner);
    let requested = vec!["drug_classifier".to_string(), "pill_detector".to_string()];
    let summary = orch.run(Some(&requested), &NullProgressSink, &CancellationToken::new()).await;

    assert_eq!(summary.failed, vec!["drug_classifier"]);
    assert_eq!(summary.completed, vec!["pill_detector"]);
    let hung = orch.session().job("drug_classifier").unwrap();
    assert!(hung.error.as_deref().unwrap().starts_with("Timed out"));
}
