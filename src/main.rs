mod analyzer;
mod plan;
mod registry;
mod remediator;

use std::error::Error;

// Fixed working-directory file names, same as the CI job that invokes us.
const DOCKERFILE: &str = "Dockerfile";
const PACKAGE_JSON: &str = "package.json";
const PLAN_FILE: &str = "remediation_plan.json";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("analyze") => {
            let Some(report_path) = args.get(2) else {
                eprintln!("Usage: vulnmend analyze <trivy-report.json>");
                std::process::exit(1);
            };

            analyzer::analyze_report(report_path, DOCKERFILE, PLAN_FILE)?;
        }
        Some("remediate") => {
            if args.len() != 3 {
                eprintln!("Usage: vulnmend remediate <remediation_plan.json>");
                std::process::exit(1);
            }

            let plan = plan::load_plan(&args[2])?;
            let token = std::env::var("GHCR_TOKEN").ok();

            remediator::run(&plan, DOCKERFILE, PACKAGE_JSON, token).await?;
        }
        _ => {
            eprintln!("Usage: vulnmend <analyze|remediate> <file>");
            std::process::exit(1);
        }
    }

    Ok(())
}
