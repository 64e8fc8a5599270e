//! `pharmatrain jobs` - list the job registry.

use crate::config::Settings;
use anyhow::Result;
use colored::Colorize;
use pharmatrain_training::{JobRegistry, ProjectLayout};
use serde_json::json;

pub fn execute(settings: &Settings, json_output: bool) -> Result<()> {
    let layout = ProjectLayout::new(settings.project_root()?);
    let registry = JobRegistry::builtin(settings.interpreter());

    if json_output {
        let out: Vec<_> = registry
            .definitions()
            .iter()
            .map(|def| {
                json!({
                    "name": def.name,
                    "script": layout.scripts_dir().join(&def.script),
                    "config": layout.configs_dir().join(&def.config),
                    "output_dir": layout.job_output_dir(&def.name),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("Training Jobs ({})", registry.definitions().len()).bold().cyan());
    println!("  {} {}", "Interpreter:".dimmed(), registry.interpreter());
    println!();
    println!("{:<24} {:<34} {}", "Name", "Script", "Config");
    println!("{}", "─".repeat(90));
    for def in registry.definitions() {
        println!("{:<24} {:<34} {}", def.name.cyan(), def.script, def.config.dimmed());
    }
    println!();
    Ok(())
}
