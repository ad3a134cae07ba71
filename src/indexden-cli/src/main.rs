use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indexden_rs::{
    Autocomplete, Categories, Client, ClientConfig, Document, DocumentIdentifier, Promotion,
    ScoringFunction, SearchOption, Variables,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

mod telemetry;

#[derive(Parser)]
#[command(name = "indexden")]
#[command(about = "Command line client for the Indexden search API", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, default_value = "indexden.json")]
    config: String,

    /// Server base URL, overrides the configuration file
    #[arg(long)]
    server_url: Option<String>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Show metadata of one index, or of all of them
    Metadata { index: Option<String> },
    /// Create an index or update its settings
    Create {
        index: String,
        #[arg(long)]
        public_search: bool,
    },
    /// Delete an index
    Delete { index: String },
    /// Index the document (JSON object) or documents (JSON array) in FILE
    Index { index: String, file: String },
    /// Remove documents by docid
    Remove {
        index: String,
        #[arg(required = true)]
        docids: Vec<String>,
    },
    /// Set variables of a document, as N=VALUE pairs
    Variables {
        index: String,
        docid: String,
        #[arg(required = true, value_parser = parse_pair::<u32, f64>)]
        variables: Vec<(u32, f64)>,
    },
    /// Set categories of a document, as NAME=VALUE pairs
    Categories {
        index: String,
        docid: String,
        #[arg(required = true, value_parser = parse_pair::<String, String>)]
        categories: Vec<(String, String)>,
    },
    /// List scoring functions
    Functions { index: String },
    /// Define a scoring function
    DefineFunction {
        index: String,
        id: u32,
        definition: String,
    },
    /// Remove a scoring function
    RemoveFunction { index: String, id: u32 },
    /// Search an index
    Search {
        index: String,
        query: String,
        #[arg(long)]
        start: Option<u32>,
        #[arg(long)]
        len: Option<u32>,
        #[arg(long)]
        function: Option<u32>,
        #[arg(long)]
        fetch: Option<String>,
        #[arg(long)]
        snippet: Option<String>,
        /// Return variables with each match; `--fetch-variables false` sends false
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        fetch_variables: Option<bool>,
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        fetch_categories: Option<bool>,
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        match_any_field: Option<bool>,
        /// Variable range filter, as N=BOTTOM:TOP[,BOTTOM:TOP]
        #[arg(long, value_parser = parse_pair::<u32, String>)]
        filter_docvar: Vec<(u32, String)>,
        /// Function range filter, as N=BOTTOM:TOP[,BOTTOM:TOP]
        #[arg(long, value_parser = parse_pair::<u32, String>)]
        filter_function: Vec<(u32, String)>,
        /// Delete the matching documents instead of listing them
        #[arg(long)]
        delete: bool,
    },
    /// Suggest query completions
    Autocomplete {
        index: String,
        query: String,
        #[arg(long)]
        field: Option<String>,
    },
    /// Promote a document to the top of a query's results
    Promote {
        index: String,
        docid: String,
        query: String,
    },
}

fn parse_pair<K, V>(raw: &str) -> std::result::Result<(K, V), String>
where
    K: FromStr,
    V: FromStr,
    K::Err: std::fmt::Display,
    V::Err: std::fmt::Display,
{
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {:?}", raw))?;
    let key = key.parse().map_err(|e| format!("bad key {:?}: {}", key, e))?;
    let value = value
        .parse()
        .map_err(|e| format!("bad value {:?}: {}", value, e))?;
    Ok((key, value))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Load the configuration file, or defaults when it does not exist.
///
/// The flag is true when defaults were used. A file that exists but does not
/// parse is an error.
fn load_config(cli: &Cli) -> Result<(ClientConfig, bool)> {
    let path = std::path::Path::new(&cli.config);
    let (mut config, defaulted) = if path.exists() {
        let config = ClientConfig::load(&cli.config)
            .with_context(|| format!("Failed to load configuration {}", cli.config))?;
        (config, false)
    } else {
        (ClientConfig::default(), true)
    };
    if let Some(url) = &cli.server_url {
        config.server_url = url.clone();
    }
    Ok((config, defaulted))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, defaulted) = load_config(&cli)?;
    let _guard = telemetry::init_telemetry(config.log_dir.as_deref())?;
    if defaulted {
        tracing::warn!("No configuration at {}, using defaults", cli.config);
    }

    tracing::debug!("Server URL: {}", config.server_url);
    let client = Client::from_config(&config)
        .with_context(|| format!("Cannot use server URL {:?}", config.server_url))?;

    run(&client, cli.cmd).await
}

async fn run(client: &Client, cmd: Cmd) -> Result<()> {
    match cmd {
        Cmd::Metadata { index: Some(index) } => {
            print_json(&client.get_index_metadata(&index).await?)?;
        }
        Cmd::Metadata { index: None } => {
            print_json(&client.get_all_indexes_metadata().await?)?;
        }
        Cmd::Create {
            index,
            public_search,
        } => {
            client.create_or_update_index(&index, public_search).await?;
            tracing::info!("Index {} created or updated", index);
        }
        Cmd::Delete { index } => {
            client.delete_index(&index).await?;
            tracing::info!("Index {} deleted", index);
        }
        Cmd::Index { index, file } => {
            let contents = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file))?;
            let value: serde_json::Value = serde_json::from_str(&contents)
                .with_context(|| format!("{} is not valid JSON", file))?;
            // Keep the arity of the file: an object gets one result, an array a list
            if value.is_array() {
                let docs: Vec<Document> = serde_json::from_value(value)?;
                print_json(&client.index_docs(&index, &docs).await?)?;
            } else {
                let doc: Document = serde_json::from_value(value)?;
                print_json(&client.index_docs(&index, &doc).await?)?;
            }
        }
        Cmd::Remove { index, mut docids } => {
            if docids.len() == 1 {
                let id = DocumentIdentifier::new(docids.remove(0));
                print_json(&client.remove_docs_from_index(&index, &id).await?)?;
            } else {
                let ids: Vec<DocumentIdentifier> =
                    docids.into_iter().map(DocumentIdentifier::new).collect();
                print_json(&client.remove_docs_from_index(&index, &ids).await?)?;
            }
        }
        Cmd::Variables {
            index,
            docid,
            variables,
        } => {
            let update = Variables {
                docid,
                variables: variables.into_iter().collect::<BTreeMap<_, _>>(),
            };
            client.create_or_update_variables(&index, &update).await?;
        }
        Cmd::Categories {
            index,
            docid,
            categories,
        } => {
            let update = Categories {
                docid,
                categories: categories.into_iter().collect::<HashMap<_, _>>(),
            };
            client.create_or_update_categories(&index, &update).await?;
        }
        Cmd::Functions { index } => {
            print_json(&client.get_all_scoring_functions(&index).await?)?;
        }
        Cmd::DefineFunction {
            index,
            id,
            definition,
        } => {
            client
                .define_scoring_function(&index, id, &ScoringFunction::new(definition))
                .await?;
        }
        Cmd::RemoveFunction { index, id } => {
            client.remove_scoring_function(&index, id).await?;
        }
        Cmd::Search {
            index,
            query,
            start,
            len,
            function,
            fetch,
            snippet,
            fetch_variables,
            fetch_categories,
            match_any_field,
            filter_docvar,
            filter_function,
            delete,
        } => {
            let mut options = SearchOption::new(query);
            options.start = start;
            options.len = len;
            options.function = function;
            options.fetch = fetch;
            options.snippet = snippet;
            // Flags only go on the wire when set
            options.fetch_variables = fetch_variables;
            options.fetch_categories = fetch_categories;
            options.match_any_field = match_any_field;
            for (n, ranges) in filter_docvar {
                options = options.filter_docvar(n, ranges);
            }
            for (n, ranges) in filter_function {
                options = options.filter_function(n, ranges);
            }

            if delete {
                client.delete_search(&index, &options).await?;
                tracing::info!("Matching documents deleted from {}", index);
            } else {
                print_json(&client.search(&index, &options).await?)?;
            }
        }
        Cmd::Autocomplete {
            index,
            query,
            field,
        } => {
            let mut request = Autocomplete::new(query);
            request.field = field;
            print_json(&client.autocomplete(&index, &request).await?)?;
        }
        Cmd::Promote {
            index,
            docid,
            query,
        } => {
            client
                .promote_result(&index, &Promotion { docid, query })
                .await?;
        }
    }

    Ok(())
}
