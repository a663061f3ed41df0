//! Embed a question and a couple of candidate passages, then rank them by
//! L2 distance the way the retrieval index does.

use docchat_embed::{EmbedConfig, EmbeddingProvider, FastEmbedProvider};

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let provider = FastEmbedProvider::create(EmbedConfig::default()).await?;
    println!(
        "Provider {} ready, dimension {}",
        provider.provider_name(),
        provider.embedding_dimension()
    );

    let passages = vec![
        "The sky is blue because of Rayleigh scattering.".to_string(),
        "Grass is green because of chlorophyll.".to_string(),
    ];
    let passage_embeddings = provider.embed_texts(&passages).await?;

    let question = "What color is the sky?";
    let question_embedding = provider.embed_text(question).await?;

    let mut ranked: Vec<(f32, &str)> = passage_embeddings
        .embeddings
        .iter()
        .zip(passages.iter())
        .map(|(embedding, text)| (l2_distance(&question_embedding, embedding), text.as_str()))
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

    println!("Question: {question}");
    for (distance, text) in ranked {
        println!("  {distance:.4}  {text}");
    }

    Ok(())
}
