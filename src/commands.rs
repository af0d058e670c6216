use std::fmt::Write as _;
use std::path::Path;

use color_eyre::Result;
use color_eyre::eyre::{Context, bail};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::ports::connector::{Playlist, Track};
use crate::services::connectors::{ConnectorKind, connect};
use crate::services::sync::persist::ChangelogFile;
use crate::services::sync::{
    ApplySummary, Changelog, ChangelogApplier, PlaylistTarget, SyncPlanner, TracingReporter,
};

/// Print the playlists of one service, optionally only the one named `name`.
pub async fn list_playlists(kind: ConnectorKind, name: Option<&str>, config: &Config) -> Result<()> {
    let connector = connect(kind, config).await?;

    let playlists = match name {
        Some(name) => connector
            .get_playlist_by_name(name)
            .await
            .wrap_err_with(|| format!("Failed to get playlist {} from {}", name, kind))?
            .into_iter()
            .collect(),
        None => connector
            .get_playlists()
            .await
            .wrap_err_with(|| format!("Failed to get playlists from {}", kind))?,
    };

    print!("{}", render_playlists(&playlists));
    Ok(())
}

pub async fn plan(
    from: ConnectorKind,
    to: ConnectorKind,
    output: Option<&Path>,
    config: &Config,
    cancel: CancellationToken,
) -> Result<()> {
    let changelog = plan_changelog(from, to, config, cancel).await?;
    print!("{}", render_changelog(&changelog));

    if let Some(output) = output {
        ChangelogFile::new(from.to_string(), to.to_string(), changelog).save(output)?;
        log::info!("Saved changelog to {}", output.display());
    }
    Ok(())
}

pub async fn apply(
    to: ConnectorKind,
    changelog_path: &Path,
    config: &Config,
    cancel: CancellationToken,
) -> Result<()> {
    let file = ChangelogFile::load(changelog_path)?;
    if file.destination != to.to_string() {
        bail!(
            "Changelog {} was planned against {}, not {}",
            changelog_path.display(),
            file.destination,
            to
        );
    }
    log::info!(
        "Applying changelog planned {} from {} to {}",
        file.created_at,
        file.source,
        file.destination
    );

    let summary = apply_changelog(to, &file.changelog, config, cancel).await?;
    println!("{}", render_summary(&summary));
    Ok(())
}

/// Plan then apply in one go; `dry_run` stops after printing the plan.
pub async fn sync(
    from: ConnectorKind,
    to: ConnectorKind,
    dry_run: bool,
    config: &Config,
    cancel: CancellationToken,
) -> Result<()> {
    let changelog = plan_changelog(from, to, config, cancel.clone()).await?;
    print!("{}", render_changelog(&changelog));

    if dry_run {
        log::info!("Dry run, nothing applied");
        return Ok(());
    }
    if !changelog.has_changes() {
        log::info!("{} already mirrors {}", to, from);
        return Ok(());
    }

    let summary = apply_changelog(to, &changelog, config, cancel).await?;
    println!("{}", render_summary(&summary));
    Ok(())
}

async fn plan_changelog(
    from: ConnectorKind,
    to: ConnectorKind,
    config: &Config,
    cancel: CancellationToken,
) -> Result<Changelog> {
    if from == to {
        bail!("Source and destination must be different services");
    }

    let source = connect(from, config).await?;
    let destination = connect(to, config).await?;
    let reporter = TracingReporter;

    let changelog = SyncPlanner::new(source.as_ref(), destination.as_ref())
        .with_reporter(&reporter)
        .with_cancellation(cancel)
        .plan()
        .await
        .wrap_err_with(|| format!("Failed to plan sync from {} to {}", from, to))?;
    Ok(changelog)
}

async fn apply_changelog(
    to: ConnectorKind,
    changelog: &Changelog,
    config: &Config,
    cancel: CancellationToken,
) -> Result<ApplySummary> {
    let destination = connect(to, config).await?;
    let reporter = TracingReporter;

    let summary = ChangelogApplier::new(destination.as_ref())
        .with_reporter(&reporter)
        .with_cancellation(cancel)
        .apply(changelog)
        .await
        .wrap_err_with(|| format!("Failed to apply changelog to {}", to))?;
    Ok(summary)
}

fn render_track(track: &Track) -> String {
    let mut line = format!("{} - {}", track.artist, track.title);
    if !track.album.is_empty() {
        let _ = write!(line, " ({})", track.album);
    }
    let _ = write!(line, " [{}]", track.id);
    line
}

pub(crate) fn render_playlists(playlists: &[Playlist]) -> String {
    if playlists.is_empty() {
        return "No playlists found\n".to_string();
    }

    let mut out = String::new();
    for playlist in playlists {
        let _ = writeln!(
            out,
            "{}\t{}\t{} tracks",
            playlist.id,
            playlist.name,
            playlist.tracks.len()
        );
    }
    out
}

pub(crate) fn render_changelog(changelog: &Changelog) -> String {
    let mut out = String::new();

    if !changelog.playlists.added.is_empty() {
        let _ = writeln!(out, "Playlists to create:");
        for playlist in &changelog.playlists.added {
            let _ = writeln!(out, "  + {}", playlist.name);
        }
    }

    for (playlist, tracks) in &changelog.tracks_by_playlist {
        if tracks.is_empty() {
            continue;
        }
        let target = match &tracks.target {
            PlaylistTarget::Existing { id } => id.as_str(),
            PlaylistTarget::ToBeCreated => "new",
        };
        let _ = writeln!(out, "{} ({}):", playlist.name, target);
        for track in &tracks.added {
            let _ = writeln!(out, "  + {}", render_track(track));
        }
        for track in &tracks.removed {
            let _ = writeln!(out, "  - {}", render_track(track));
        }
        for track in &tracks.missing {
            let _ = writeln!(out, "  ? {} (not found)", render_track(track));
        }
    }

    let stats = changelog.stats();
    let _ = writeln!(
        out,
        "{} playlists to create, {} tracks to add, {} to remove, {} not found",
        stats.playlists_to_create, stats.tracks_to_add, stats.tracks_to_remove, stats.tracks_missing
    );
    out
}

fn render_summary(summary: &ApplySummary) -> String {
    format!(
        "Created {} playlists, added {} tracks, removed {} tracks",
        summary.playlists_created, summary.tracks_added, summary.tracks_removed
    )
}
