use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use tracing::info;

use sift_core::{
    AppliedFilters, ConditionalFilter, EngineHandle, FilterCondition, FilterLogic, SourceFormat,
};

use crate::cli::{FieldsArgs, ViewArgs};

/// Enforced at the boundary, not by the engine.
const MAX_SOURCE_BYTES: u64 = 500 * 1024 * 1024;

pub async fn run_view(args: ViewArgs) -> Result<()> {
    let format = resolve_format(&args.input, args.format.as_deref())?;
    let content = read_source(&args.input)?;
    let engine = EngineHandle::spawn(args.page_size.max(1));
    let mut view = engine
        .load(content, format, args.selector.clone())
        .await?;
    info!(
        items = view.metadata.item_count,
        lines = view.metadata.lines_read,
        "loaded {}",
        args.input
    );

    if let Some(filters) = assemble_filters(&args)? {
        view = engine.refine(filters).await?;
    }
    if args.page != 1 {
        view = engine.page(args.page).await?;
    }
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

pub async fn run_fields(args: FieldsArgs) -> Result<()> {
    let format = resolve_format(&args.input, args.format.as_deref())?;
    let content = read_source(&args.input)?;
    let engine = EngineHandle::spawn(sift_core::DEFAULT_PAGE_SIZE);
    let view = engine.load(content, format, args.selector).await?;
    let analysis = view
        .metadata
        .field_analysis
        .ok_or_else(|| anyhow!("load response carried no field analysis"))?;
    for path in &analysis.fields {
        let count = analysis.counts.get(path).copied().unwrap_or_default();
        println!("{count:>8}  {path}");
    }
    Ok(())
}

fn resolve_format(input: &str, flag: Option<&str>) -> Result<SourceFormat> {
    match flag {
        Some(name) => Ok(name.parse()?),
        None => SourceFormat::from_path(Path::new(input)).ok_or_else(|| {
            anyhow!("cannot infer the format of {input}; pass --format xml|json|csv")
        }),
    }
}

fn read_source(input: &str) -> Result<String> {
    let meta = fs::metadata(input).with_context(|| format!("failed to read {input}"))?;
    if meta.len() > MAX_SOURCE_BYTES {
        bail!("{input} is {} bytes; the limit is 500 MB", meta.len());
    }
    fs::read_to_string(input).with_context(|| format!("failed to read {input}"))
}

/// Builds the filter set for this invocation: the optional YAML file
/// first, CLI flags layered on top. Returns `None` when nothing asks
/// for a refine, so a plain `view` stays a pure load.
fn assemble_filters(args: &ViewArgs) -> Result<Option<AppliedFilters>> {
    let mut filters = match &args.filters {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read filter file {path}"))?;
            serde_yaml::from_str(&raw)
                .with_context(|| format!("invalid filter file {path}"))?
        }
        None => AppliedFilters::default(),
    };
    let mut requested = args.filters.is_some();
    if !args.search.is_empty() {
        filters.search_term = args.search.clone();
        requested = true;
    }
    for (idx, raw) in args.conditions.iter().enumerate() {
        filters.conditional_filters.push(parse_condition(idx, raw)?);
        requested = true;
    }
    if !args.hide.is_empty() {
        filters.hidden_fields.extend(args.hide.iter().cloned());
        requested = true;
    }
    if args.skip_empty {
        filters.show_empty_fields = false;
        requested = true;
    }
    filters.filter_logic = parse_logic(&args.logic)?;
    Ok(requested.then_some(filters))
}

fn parse_condition(idx: usize, raw: &str) -> Result<ConditionalFilter> {
    let mut parts = raw.splitn(3, ':');
    let field = parts.next().unwrap_or_default();
    let op = parts
        .next()
        .ok_or_else(|| anyhow!("condition '{raw}' must look like FIELD:OP[:VALUE]"))?;
    let condition: FilterCondition = op.parse()?;
    let value = parts.next().unwrap_or_default();
    Ok(ConditionalFilter {
        id: format!("cli-{idx}"),
        field: field.to_string(),
        condition,
        value: value.to_string(),
    })
}

fn parse_logic(raw: &str) -> Result<FilterLogic> {
    match raw.to_lowercase().as_str() {
        "and" => Ok(FilterLogic::And),
        "or" => Ok(FilterLogic::Or),
        other => bail!("unknown filter logic '{other}'; use and | or"),
    }
}
