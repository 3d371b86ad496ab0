use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    cli::{ActiveCmd, ConvertCmd, OutputOpts, ProjectCmd, SubsCmd, TimeCmd},
    config::Config,
    editor::{Bound, Editor, TimeEdit},
    formats::{self, Format, time},
    model::{RecordId, SubtitleRecord},
    store::{JsonFileStore, ListInput, Project, SubtitleStore},
    timeline,
};

pub fn run_convert(cmd: ConvertCmd, cfg: &Config) -> Result<()> {
    let span = tracing::info_span!("convert", input = %cmd.input.display(), to = ?cmd.to);
    let _g = span.enter();

    let records = read_records(&cmd.input, cmd.from)?;
    log_records_summary(&records, cfg);

    let rendered = formats::render_any(&records, cmd.to, cfg.export.json_pretty)?;
    emit(&rendered, &cmd.out, Some(&cmd.input), cmd.to)
}

pub fn run_active(cmd: ActiveCmd, cfg: &Config) -> Result<()> {
    let requested = time::parse_time_or_seconds(&cmd.at)
        .ok_or_else(|| anyhow!("bad position '{}': expected 00:00:00.000 or seconds", cmd.at))?;
    let records = read_records(&cmd.input, cmd.from)?;

    let mut at = timeline::seek_target(requested, cmd.duration);
    if let Some(n) = cmd.loop_cue {
        let r = n
            .checked_sub(1)
            .and_then(|i| records.get(i))
            .ok_or_else(|| anyhow!("no subtitle #{n} to loop over"))?;
        if let Some(back) =
            timeline::LoopWindow::from_record(r).rewind_target(at, cfg.editor.loop_epsilon)
        {
            tracing::info!(from = at, to = back, "loop rewind");
            at = back;
        }
    }
    println!("at\t{}", time::format_time(at));

    match timeline::active_index(at, &records) {
        Some(i) => {
            let r = &records[i];
            println!(
                "{}\t{} --> {}\t{}",
                i + 1,
                time::format_time(r.start),
                time::format_time(r.end),
                r.content.chinese
            );
        }
        None => println!("none"),
    }
    Ok(())
}

pub fn run_time(cmd: TimeCmd) -> Result<()> {
    match cmd {
        TimeCmd::Format { seconds } => println!("{}", time::format_time(seconds)),
        TimeCmd::Parse { text } => {
            let v = time::parse_time(&text)
                .ok_or_else(|| anyhow!("bad timestamp '{text}': expected 00:00:00.000"))?;
            println!("{v}");
        }
    }
    Ok(())
}

pub fn run_project(cmd: ProjectCmd, cfg: &Config) -> Result<()> {
    let mut store = JsonFileStore::open(&cfg.store.path)?;

    match cmd {
        ProjectCmd::Init {
            id,
            path,
            description,
        } => {
            let now = Utc::now();
            let created_at = store.project(&id)?.map(|p| p.created_at).unwrap_or(now);
            store.put_project(Project {
                id: id.clone(),
                path_with_namespace: path,
                description,
                created_at,
                updated_at: now,
            })?;
            tracing::info!(project = id.as_str(), "project saved");
        }
        ProjectCmd::Show { id } => {
            let p = store
                .project(&id)?
                .ok_or_else(|| anyhow!("no such project: {id}"))?;
            println!("{}", serde_json::to_string_pretty(&p)?);
        }
    }
    Ok(())
}

pub fn run_subs(cmd: SubsCmd, cfg: &Config) -> Result<()> {
    let store = JsonFileStore::open(&cfg.store.path)?;

    match cmd {
        SubsCmd::List {
            project,
            start_after,
            end_before,
        } => {
            let mut ed = Editor::new(project.clone(), store, cfg.editor.clone());
            ed.refresh_with(&ListInput {
                project_id: project,
                start_after,
                end_before,
            })?;
            print_records(ed.records());
        }
        SubsCmd::Add {
            project,
            at,
            duration,
        } => {
            let position = time::parse_time_or_seconds(&at)
                .ok_or_else(|| anyhow!("bad position '{at}': expected 00:00:00.000 or seconds"))?;
            let mut ed = open_editor(project, store, cfg)?;
            ed.add_at(position, duration)?;
            print_records(ed.records());
        }
        SubsCmd::Set {
            project,
            id,
            start,
            end,
            text,
            ja,
            romaji,
        } => {
            let mut ed = open_editor(project, store, cfg)?;
            let id = RecordId::Persisted(id);

            for (bound, value) in [(Bound::Start, start), (Bound::End, end)] {
                let Some(value) = value else { continue };
                if let TimeEdit::Rejected { revert_to } = ed.edit_time_text(&id, bound, &value)? {
                    return Err(anyhow!(
                        "bad timestamp '{value}': expected 00:00:00.000 (kept {revert_to})"
                    ));
                }
            }
            if let Some(t) = text {
                ed.edit_chinese(&id, &t)?;
            }
            if let Some(t) = ja {
                ed.edit_ja(&id, &t)?;
            }
            if let Some(t) = romaji {
                ed.edit_romaji(&id, &t)?;
            }
            ed.save(&id)?;
            print_records(ed.records());
        }
        SubsCmd::Delete { project, id } => {
            let mut ed = open_editor(project, store, cfg)?;
            ed.delete(&RecordId::Persisted(id))?;
            tracing::info!(remaining = ed.records().len(), "deleted");
        }
        SubsCmd::Import {
            project,
            input,
            from,
        } => {
            let mut ed = open_editor(project, store, cfg)?;
            let n = ed.import(&input, from)?;
            log_records_summary(ed.records(), cfg);
            let stored = ed.replace_stored()?;
            tracing::info!(imported = n, stored, "import complete");
            println!("{n} items imported");
        }
        SubsCmd::Export { project, to, out } => {
            let ed = open_editor(project.clone(), store, cfg)?;
            let rendered = ed.export(to, cfg.export.json_pretty)?;
            let fallback = PathBuf::from(format!("subtitles_{project}.{}", to.extension()));
            emit(&rendered, &out, Some(&fallback), to)?;
        }
    }
    Ok(())
}

fn open_editor(
    project: String,
    store: JsonFileStore,
    cfg: &Config,
) -> Result<Editor<JsonFileStore>> {
    let ed = Editor::open(project, store, cfg.editor.clone())?;
    if ed.store().project(ed.project_id())?.is_none() {
        tracing::warn!(project = ed.project_id(), "project is not registered in the store");
    }
    Ok(ed)
}

fn read_records(path: &Path, forced: Option<Format>) -> Result<Vec<SubtitleRecord>> {
    let fmt = match forced {
        Some(f) => f,
        None => Format::from_path(path)?,
    };
    tracing::info!(?fmt, "input format selected");

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading input: {}", path.display()))?;
    tracing::info!(bytes = raw.len(), "read input");

    let records = formats::parse_any(&raw, fmt)
        .with_context(|| format!("failed parsing input as {fmt:?}"))?;
    tracing::info!(count = records.len(), "items imported");
    Ok(records)
}

fn print_records(records: &[SubtitleRecord]) {
    for r in records {
        println!(
            "{}\t{}\t{}\t{}",
            r.id,
            time::format_time(r.start),
            time::format_time(r.end),
            r.content.chinese.replace('\n', " / ")
        );
    }
}

fn log_records_summary(records: &[SubtitleRecord], cfg: &Config) {
    let span_end = records.iter().map(|r| r.end).fold(0.0, f64::max);
    tracing::info!(
        records = records.len(),
        last_end = time::format_time(span_end).as_str(),
        "subtitle summary"
    );

    if tracing::enabled!(tracing::Level::DEBUG) {
        let n = cfg.logging.debug_record_samples.min(records.len());
        for (i, r) in records.iter().take(n).enumerate() {
            tracing::debug!(
                idx = i,
                start = r.start,
                end = r.end,
                chars = r.content.chinese.chars().count(),
                "record sample"
            );
        }
    }
}

fn emit(rendered: &str, out: &OutputOpts, stem_source: Option<&Path>, to: Format) -> Result<()> {
    if out.stdout {
        print!("{rendered}");
        tracing::info!(mode = "stdout", "wrote output");
        return Ok(());
    }

    let out_path = derive_output_path(out.output.as_deref(), stem_source, to)?;
    write_output(&out_path, rendered, out.overwrite)?;
    tracing::info!(path = %out_path.display(), "wrote output file");
    Ok(())
}

fn derive_output_path(output: Option<&Path>, input: Option<&Path>, to: Format) -> Result<PathBuf> {
    if let Some(o) = output {
        return Ok(o.to_path_buf());
    }

    let p = input.ok_or_else(|| anyhow!("output path required when --stdout is not set"))?;
    let stem = p
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("bad input filename"))?;

    let parent = p.parent().unwrap_or_else(|| Path::new("."));
    Ok(parent.join(format!("{stem}.{}", to.extension())))
}

fn write_output(path: &Path, data: &str, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        return Err(anyhow!(
            "refusing to overwrite existing file (pass --overwrite): {}",
            path.display()
        ));
    }
    fs::write(path, data).with_context(|| format!("failed writing {}", path.display()))?;
    Ok(())
}
