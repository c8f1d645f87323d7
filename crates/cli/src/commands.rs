use crate::output::{print_json, AnswerOutput, ConfigView, StatusOutput};
use crate::AppContext;
use anyhow::{Context, Result};
use manualrag_config::ConfigProvider;
use manualrag_indexer::{IndexerSettings, ManualIndexer};
use manualrag_retrieval::{Generator, OpenAiChatGenerator, RetrievalPipeline};
use manualrag_vector_store::{DefaultEmbeddingConnector, GenerationStore};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub async fn run_index(ctx: &AppContext, manuals: &Path, json: bool) -> Result<()> {
    let connector = DefaultEmbeddingConnector::from_env()?;
    log::info!("Embedding backend: {}", connector.mode().as_str());
    let indexer = ManualIndexer::new(
        &ctx.data_dir,
        ctx.config.clone(),
        Arc::new(connector),
        IndexerSettings::from_env(),
    )?;

    let stats = indexer
        .build(manuals)
        .await
        .with_context(|| format!("Failed to index {}", manuals.display()))?;

    let mut config = ctx.config.load().await?;
    config.manuals = stats.sources.clone();
    ctx.config
        .save(&config)
        .await
        .context("Failed to record indexed manuals")?;

    if json {
        print_json(&stats)?;
    } else {
        println!(
            "Indexed {} documents into {} fragments ({} batches) in {} ms",
            stats.documents, stats.fragments, stats.batches, stats.time_ms
        );
        if let Some(generation) = &stats.generation {
            println!("Generation: {generation}");
        }
        for error in &stats.errors {
            println!("Skipped: {error}");
        }
    }
    Ok(())
}

pub async fn run_ask(
    ctx: &AppContext,
    question: &str,
    top_k: usize,
    prompt_only: bool,
    json: bool,
) -> Result<()> {
    let connector = DefaultEmbeddingConnector::from_env()?;
    let pipeline = RetrievalPipeline::new(&ctx.data_dir, ctx.config.clone(), Arc::new(connector));
    let prompt = pipeline.answer_context(question, top_k).await?;

    if prompt_only {
        if json {
            print_json(&prompt)?;
        } else {
            print!("{}", prompt.system_prompt);
        }
        return Ok(());
    }

    let config = ctx.config.load().await?;
    let generator = OpenAiChatGenerator::from_env(config.credential()?)?;

    if json {
        let mut answer = String::new();
        generator
            .generate(&prompt, &mut |token: &str| answer.push_str(token))
            .await?;
        print_json(&AnswerOutput {
            question: &prompt.question,
            answer,
            fragments: &prompt.fragments,
        })?;
    } else {
        generator
            .generate(&prompt, &mut |token: &str| {
                print!("{token}");
                let _ = io::stdout().flush();
            })
            .await?;
        println!();
    }
    Ok(())
}

pub async fn run_config_show(ctx: &AppContext, json: bool) -> Result<()> {
    let config = ctx.config.load().await?;
    let view = ConfigView::new(&config);
    if json {
        print_json(&view)?;
    } else {
        println!("Config file: {}", ctx.config.path().display());
        println!(
            "Credential:  {}",
            if view.credential.is_empty() {
                "(not set)"
            } else {
                view.credential.as_str()
            }
        );
        println!("Context:     {}", view.context);
        println!("Manuals:     {}", view.manuals.join(", "));
    }
    Ok(())
}

pub async fn run_config_set(
    ctx: &AppContext,
    credential: Option<String>,
    context: Option<String>,
    context_file: Option<PathBuf>,
) -> Result<()> {
    let mut config = ctx.config.load().await?;

    if let Some(credential) = credential {
        config.embedding_service_credential = credential.trim().to_string();
    }
    if let Some(path) = context_file {
        config.system_context = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
    } else if let Some(context) = context {
        config.system_context = context;
    }

    ctx.config.save(&config).await?;
    log::info!("Configuration saved to {}", ctx.config.path().display());
    Ok(())
}

pub async fn run_status(ctx: &AppContext, json: bool) -> Result<()> {
    let store = GenerationStore::new(&ctx.data_dir);
    let status = match store.current_id().await? {
        None => StatusOutput {
            indexed: false,
            generation: None,
            fragments: 0,
            dimension: 0,
        },
        Some(_) => {
            let generation = store.current().await?;
            StatusOutput {
                indexed: true,
                generation: Some(generation.id().to_string()),
                fragments: generation.index().len(),
                dimension: generation.index().dimension(),
            }
        }
    };

    if json {
        print_json(&status)?;
    } else if let Some(generation) = &status.generation {
        println!("Generation: {generation}");
        println!("Fragments:  {}", status.fragments);
        println!("Dimension:  {}", status.dimension);
    } else {
        println!("No index built yet; run `manualrag index`");
    }
    Ok(())
}
