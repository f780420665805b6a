//! Attachment synchronization.

use crate::repository::ContentRepository;
use tracing::{debug, warn};

/// Replaces the destination page's attachment set with the source page's.
///
/// Two phases, clean-slate every call: delete every destination attachment
/// unconditionally, then download each source attachment to a staging
/// directory and upload it to the destination. There is no incremental
/// diff; unchanged files are deleted and re-uploaded too, so no stale
/// attachment can survive. Individual failures are logged and skipped;
/// returns false iff anything failed.
pub async fn sync_attachments(
    repo: &dyn ContentRepository,
    source_page_id: &str,
    dest_page_id: &str,
) -> bool {
    let mut all_ok = true;

    match repo.list_attachments(dest_page_id).await {
        Ok(existing) => {
            for attachment in existing {
                if let Err(e) = repo.delete_attachment(&attachment.id).await {
                    warn!(
                        "failed to delete destination attachment {}: {e}",
                        attachment.filename
                    );
                    all_ok = false;
                }
            }
        }
        Err(e) => {
            warn!("failed to list attachments of destination {dest_page_id}: {e}");
            all_ok = false;
        }
    }

    let source = match repo.list_attachments(source_page_id).await {
        Ok(source) => source,
        Err(e) => {
            warn!("failed to list attachments of source {source_page_id}: {e}");
            return false;
        }
    };

    // Staging area for the payloads in transit; removed on drop, so no
    // temp file survives any exit path.
    let staging = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            warn!("failed to create attachment staging directory: {e}");
            return false;
        }
    };

    for attachment in source {
        let payload = match repo.download_attachment(&attachment.download_ref).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!("download of {} failed: {e}", attachment.filename);
                all_ok = false;
                continue;
            }
        };

        let staged = staging.path().join(&attachment.filename);
        if let Err(e) = tokio::fs::write(&staged, &payload).await {
            warn!("failed to stage {}: {e}", attachment.filename);
            all_ok = false;
            continue;
        }

        match repo.upload_attachment(&staged, dest_page_id).await {
            Ok(id) => {
                debug!("copied attachment {} (id: {id})", attachment.filename);
            }
            Err(e) => {
                warn!("upload of {} failed: {e}", attachment.filename);
                all_ok = false;
            }
        }

        if let Err(e) = tokio::fs::remove_file(&staged).await {
            warn!("failed to remove staged file {}: {e}", attachment.filename);
        }
    }

    all_ok
}
