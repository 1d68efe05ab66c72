use std::{env, process::ExitCode, sync::Arc};

use ops_assistant::{
    Assistant, Config, LlmGateway, Toolset,
    agent::QueryOutcome,
    agent::types::StepStatus,
    config::Provider,
    error::Result,
    llm::{GeminiProvider, ModelProvider, OpenAiProvider},
    tools::{GithubRepoSearch, OpenWeatherClient, WikipediaClient},
};

#[tokio::main]
async fn main() -> ExitCode {
    let query = env::args().skip(1).collect::<Vec<_>>().join(" ");
    if query.trim().is_empty() {
        print_usage();
        return ExitCode::FAILURE;
    }

    let config = match Config::from_env().and_then(|c| c.validate().map(|()| c)) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = ops_assistant::telemetry::init(&config.log_level) {
        eprintln!("Failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    let assistant = match build_assistant(&config) {
        Ok(assistant) => assistant,
        Err(err) => {
            eprintln!("Startup error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = assistant.process_query(&query).await;
    print_outcome(&outcome);

    if outcome.error.is_some() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn build_assistant(config: &Config) -> Result<Assistant<Box<dyn ModelProvider>>> {
    let timeout = config.request_timeout();

    let provider: Box<dyn ModelProvider> = match config.llm_provider {
        Provider::OpenAi => Box::new(OpenAiProvider::new(
            config.openai_api_key.clone().unwrap_or_default(),
            config.openai_model.clone(),
            config.openai_base_url.clone(),
            timeout,
        )?),
        Provider::Gemini => Box::new(GeminiProvider::new(
            config.gemini_api_key.clone().unwrap_or_default(),
            config.gemini_model.clone(),
            timeout,
        )?),
    };
    let gateway = LlmGateway::new(provider).with_max_attempts(config.max_retries);

    let tools = Toolset {
        repo: Some(Arc::new(GithubRepoSearch::new(
            config.github_token.clone(),
            timeout,
        )?)),
        weather: Some(Arc::new(OpenWeatherClient::new(
            config.openweather_api_key.clone().unwrap_or_default(),
            timeout,
        )?)),
        encyclopedia: Some(Arc::new(WikipediaClient::new(timeout)?)),
    };

    Ok(Assistant::new(gateway, tools))
}

fn print_usage() {
    eprintln!("Usage: ops-assistant <query>");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  ops-assistant \"What's the weather in London?\"");
    eprintln!("  ops-assistant \"Compare weather in Paris and Tokyo\"");
    eprintln!("  ops-assistant \"Find popular rust web frameworks\"");
    eprintln!("  ops-assistant \"Tell me about quantum computing\"");
}

fn print_outcome(outcome: &QueryOutcome) {
    let rule = "=".repeat(60);
    println!("{rule}");
    println!("RESULTS");
    println!("{rule}");
    println!("Query: {}", outcome.query);
    println!("Success: {}", if outcome.success { "yes" } else { "no" });
    println!("Total time: {:.2}s", outcome.total_time);

    if let Some(error) = &outcome.error {
        println!();
        println!("Error: {error}");
        return;
    }

    if let Some(plan) = &outcome.plan {
        println!();
        println!("Plan: {}", plan.task_description);
        if let Ok(rendered) = serde_json::to_string_pretty(&plan.steps) {
            println!("{rendered}");
        }
    }

    if let Some(execution) = &outcome.execution {
        println!();
        println!(
            "Execution: {} completed, {} failed",
            execution.steps_completed, execution.steps_failed
        );
        for result in &execution.results {
            match result.status {
                StepStatus::Success => {
                    println!("  Step {}: ok ({:.2}s)", result.step_number, result.execution_time);
                }
                StepStatus::Failed => {
                    println!(
                        "  Step {}: failed - {}",
                        result.step_number,
                        result.error.as_deref().unwrap_or("unknown error")
                    );
                }
            }
        }
    }

    if let Some(verification) = &outcome.verification {
        println!();
        println!(
            "Verification: complete={}, correct={}, confidence={:.2}",
            verification.is_complete, verification.is_correct, verification.confidence_score
        );
        for issue in &verification.issues {
            println!("  Issue: {issue}");
        }
        println!();
        println!("{}", verification.formatted_output);
        println!();
        println!("Summary: {}", verification.summary);
        for recommendation in &verification.recommendations {
            println!("  Suggestion: {recommendation}");
        }
    }
}
