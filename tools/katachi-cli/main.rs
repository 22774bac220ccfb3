use clap::Parser;
use katachi::prelude::*;
use serde::Deserialize;
use std::fs;
use std::process;

/// Inspects a content form: builds the form tree for a schema and a
/// content value, then prints sections, derived field state, validation
/// findings and the translation status.
#[derive(Parser)]
#[command(name = "katachi-cli", version, about)]
struct Args {
    /// Path to the schema JSON (fields, rules, component schemas).
    schema: String,

    /// Path to the content value JSON ({ field: { partition: value } }).
    content: Option<String>,

    /// Languages as comma-separated ISO codes; the first is the master.
    #[arg(long, default_value = "en")]
    languages: String,
}

#[derive(Deserialize)]
struct SchemaFile {
    schema: Schema,
    #[serde(default)]
    components: Vec<Schema>,
}

fn main() {
    let args = Args::parse();

    let schema_json = match fs::read_to_string(&args.schema) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Failed to read schema file '{}': {}", args.schema, e);
            process::exit(1);
        }
    };
    let schema_file: SchemaFile = match serde_json::from_str(&schema_json) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to parse schema file '{}': {}", args.schema, e);
            process::exit(1);
        }
    };

    let mut languages: Vec<Language> = Vec::new();
    for (index, code) in args.languages.split(',').enumerate() {
        if index == 0 {
            languages.push(Language::master(code.trim()));
        } else {
            languages.push(Language::new(code.trim()));
        }
    }

    let mut form = ContentFormTree::new(
        languages,
        schema_file.schema,
        schema_file.components,
        RuleContext::default(),
        FormOptions::default(),
    );

    if let Some(content_path) = &args.content {
        let content_json = match fs::read_to_string(content_path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Failed to read content file '{}': {}", content_path, e);
                process::exit(1);
            }
        };
        let content: serde_json::Value = match serde_json::from_str(&content_json) {
            Ok(value) => value,
            Err(e) => {
                eprintln!("Failed to parse content file '{}': {}", content_path, e);
                process::exit(1);
            }
        };
        form.load(&content, true);
    }

    for (index, section) in form.sections().iter().enumerate() {
        let title = section
            .separator
            .as_ref()
            .map(|f| f.name.as_str())
            .unwrap_or("(leading)");
        println!("Section {} [{}]{}", index, title, if section.hidden { " hidden" } else { "" });

        for name in &section.fields {
            let Some(field) = form.field(name) else { continue };
            let state = field.state;
            println!(
                "  {} hidden={} disabled={} required={}",
                name, state.hidden, state.disabled, state.required
            );
            for (partition, node) in field.partitions() {
                let state = node.state();
                let value = node.value();
                println!(
                    "    .{} hidden={} disabled={} required={} value={}",
                    partition.key,
                    state.hidden,
                    state.disabled,
                    state.required,
                    field_display(&field.field, value.as_ref(), None)
                );
            }
        }
    }

    let errors = form.errors();
    if errors.is_empty() {
        println!("Validation: ok");
    } else {
        println!("Validation: {} finding(s)", errors.len());
        for (path, issue) in errors {
            println!("  {}: {}", path, issue);
        }
    }

    let mut status: Vec<_> = form.translation_status().into_iter().collect();
    status.sort();
    for (language, percent) in status {
        println!("Translation {}: {}%", language, percent);
    }
}
