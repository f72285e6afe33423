//! Category folders under the output root.
//!
//! The existing folder names are read fresh before every categorisation call
//! (never cached) so a category created for document 3 is offered to the
//! model for document 4.

use crate::error::PipelineError;
use crate::pipeline::sanitize::sanitize_folder_name;
use crate::vault::{join_path, normalize_path, EntryKind, Vault};
use tracing::{debug, info};

/// Names of the category folders directly under `output_root`.
///
/// # Errors
/// [`PipelineError::NotAFolder`] when the root is missing or is a file.
pub async fn existing_categories(
    vault: &dyn Vault,
    output_root: &str,
) -> Result<Vec<String>, PipelineError> {
    let root = normalize_path(output_root);
    match vault.entry(&root).await? {
        Some(EntryKind::Folder) => vault.list_folders(&root).await,
        _ => Err(PipelineError::NotAFolder { path: root }),
    }
}

/// Sanitize the model's `category` answer and make sure a folder for it
/// exists under `output_root`. Returns the folder's vault path.
///
/// An existing folder with the same name is reused as-is. An answer that
/// sanitizes to nothing is a [`PipelineError::MalformedResponse`].
pub async fn resolve_category_folder(
    vault: &dyn Vault,
    output_root: &str,
    category: &str,
) -> Result<String, PipelineError> {
    let root = normalize_path(output_root);
    if vault.entry(&root).await? != Some(EntryKind::Folder) {
        return Err(PipelineError::NotAFolder { path: root });
    }

    let name = sanitize_folder_name(category);
    if name.is_empty() || name == "." || name == ".." {
        return Err(PipelineError::MalformedResponse {
            detail: format!("category answer {category:?} is not a usable folder name"),
        });
    }
    let folder = join_path(&root, &name);

    match vault.entry(&folder).await? {
        Some(EntryKind::Folder) => {
            debug!("Reusing category folder '{}'", folder);
        }
        Some(EntryKind::File) => {
            return Err(PipelineError::NotAFolder { path: folder });
        }
        None => {
            vault.create_folder(&folder).await?;
            info!("Created category folder '{}'", folder);
        }
    }

    Ok(folder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::MemoryVault;

    fn vault_with_categories() -> MemoryVault {
        MemoryVault::new()
            .with_folder("Canvases/Alignment")
            .with_folder("Canvases/Scaling")
            .with_file("Canvases/loose.canvas", b"{}".to_vec())
    }

    #[tokio::test]
    async fn lists_only_direct_subfolders() {
        let vault = vault_with_categories().with_folder("Canvases/Scaling/Nested");
        let cats = existing_categories(&vault, "Canvases").await.unwrap();
        assert_eq!(cats, vec!["Alignment", "Scaling"]);
    }

    #[tokio::test]
    async fn existing_category_is_reused() {
        let vault = vault_with_categories();
        let folder = resolve_category_folder(&vault, "Canvases", "Scaling")
            .await
            .unwrap();
        assert_eq!(folder, "Canvases/Scaling");
        assert_eq!(
            vault.folders(),
            vec!["Canvases", "Canvases/Alignment", "Canvases/Scaling"]
        );
    }

    #[tokio::test]
    async fn new_category_is_sanitized_and_created() {
        let vault = vault_with_categories();
        let folder = resolve_category_folder(&vault, "Canvases", " Reinforcement Learning: RL ")
            .await
            .unwrap();
        assert_eq!(folder, "Canvases/Reinforcement_Learning__RL");
        assert_eq!(
            vault.entry(&folder).await.unwrap(),
            Some(EntryKind::Folder)
        );
    }

    #[tokio::test]
    async fn missing_or_file_root_is_rejected() {
        let vault = vault_with_categories();
        assert!(matches!(
            existing_categories(&vault, "Nope").await,
            Err(PipelineError::NotAFolder { .. })
        ));
        assert!(matches!(
            resolve_category_folder(&vault, "Canvases/loose.canvas", "X").await,
            Err(PipelineError::NotAFolder { .. })
        ));
    }

    #[tokio::test]
    async fn blank_category_is_rejected_without_touching_the_root() {
        let vault = vault_with_categories();
        for answer in ["", "   ", "\n\t", ".."] {
            let err = resolve_category_folder(&vault, "Canvases", answer)
                .await
                .unwrap_err();
            assert!(
                matches!(err, PipelineError::MalformedResponse { .. }),
                "{answer:?} gave {err:?}"
            );
        }
        assert_eq!(
            vault.folders(),
            vec!["Canvases", "Canvases/Alignment", "Canvases/Scaling"]
        );
    }

    #[tokio::test]
    async fn category_clashing_with_a_file_is_rejected() {
        let vault = MemoryVault::new().with_file("Out/Physics", b"x".to_vec());
        let err = resolve_category_folder(&vault, "Out", "Physics")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotAFolder { ref path } if path == "Out/Physics"));
    }
}
