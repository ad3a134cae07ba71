//! Quickstart Example
//!
//! Creates an index, indexes a few documents, searches them and cleans up.
//! Point it at a running service with the server URL as first argument.
//!
//! Run with: cargo run --example quickstart -- http://localhost:8080

use indexden_rs::{Client, Document, DocumentIdentifier, ScoringFunction, SearchOption};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let server_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8080".to_string());

    let client = Client::new(&server_url)?;
    println!("Endpoint: {}\n", client.uri_builder().endpoint());

    let index = "quickstart";
    client.create_or_update_index(index, false).await?;
    println!("✅ Index {} ready", index);

    // One document in, one result out
    let single = Document::new("mysingledoc", "a bit of text - single")
        .with_category("type", "a certain type")
        .with_variable(0, 1.0);
    let result = client.index_docs(index, &single).await?;
    println!("📝 Indexed {}: added={}", single.docid, result.added);

    // A batch in, one result per document out
    let batch = vec![
        Document::new("atestdoc", "a bit of text for the test"),
        Document::new("anothertestdoc", "a bit of text for the second test"),
    ];
    let results = client.index_docs(index, &batch).await?;
    for (doc, res) in batch.iter().zip(&results) {
        println!("📝 Indexed {}: added={} {:?}", doc.docid, res.added, res.error);
    }

    client
        .define_scoring_function(index, 1, &ScoringFunction::new("-age"))
        .await?;

    let found = client
        .search(
            index,
            &SearchOption::new("text")
                .function(1)
                .fetch_categories(true)
                .filter_docvar(0, "0:*"),
        )
        .await?;
    println!("\n🔍 {:?} matches in {:.3}s", found.matches, found.search_time);
    for hit in &found.results {
        println!("   {} type={:?}", hit.docid, hit.category("type"));
    }

    let ids: Vec<DocumentIdentifier> = batch.iter().map(Document::identifier).collect();
    client.remove_docs_from_index(index, &ids).await?;
    client.delete_index(index).await?;
    println!("\n🧹 Cleaned up");

    Ok(())
}
