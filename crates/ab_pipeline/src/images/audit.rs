use ab_core::{AuditVerdict, ImageAuditor, ImageStats, Result, Section};
use chrono::Local;
use tokio::fs;

use super::workshop::ImageWorkshop;
use crate::config::CONTENT_IMAGE_SIZE;
use crate::logging::Logger;

/// Generates and audits every image placeholder.
///
/// Passing images replace their placeholder with an `image` section. Rejected
/// images are deleted from disk and their section is dropped, as is any
/// placeholder whose generation failed. Other sections pass through untouched.
pub async fn audit_sections(
    workshop: &ImageWorkshop,
    auditor: &dyn ImageAuditor,
    sections: Vec<Section>,
) -> Result<(Vec<Section>, ImageStats)> {
    let logger = Logger::stage("images");
    let total = sections.iter().filter(|s| s.is_placeholder()).count();
    let mut stats = ImageStats::default();
    let mut kept = Vec::with_capacity(sections.len());

    for section in sections {
        let (id, description) = match section {
            Section::ImagePlaceholder { id, description, .. } => (id, description),
            other => {
                kept.push(other);
                continue;
            }
        };
        stats.total_placeholders += 1;
        let item = Logger::stage("images").with_prefix(format!("{}/{} {}", stats.total_placeholders, total, id));

        let prefix = format!("{}_{}", id, stats.total_placeholders);
        match workshop.generate(&description, &prefix, CONTENT_IMAGE_SIZE).await {
            Ok(image) => {
                stats.generated += 1;
                let verdict = match auditor.audit(&image.bytes, &description).await {
                    Ok(verdict) => verdict,
                    Err(e) => AuditVerdict::Fail(format!("audit error: {}", e)),
                };
                match verdict {
                    AuditVerdict::Pass => {
                        stats.passed += 1;
                        item.info(&format!("✅ PASS {}", image.url));
                        kept.push(Section::Image {
                            id,
                            description,
                            url: image.url,
                            audit_status: "PASS".to_string(),
                            audit_timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                        });
                    }
                    AuditVerdict::Fail(reason) => {
                        stats.failed += 1;
                        stats.removed += 1;
                        item.warn(&format!("❌ FAIL {}, removing {}", reason, image.path.display()));
                        if let Err(e) = fs::remove_file(&image.path).await {
                            item.debug(&format!("could not remove {}: {}", image.path.display(), e));
                        }
                    }
                }
            }
            Err(e) => {
                stats.failed += 1;
                stats.removed += 1;
                item.warn(&format!("🗑️ generation failed, dropping section: {}", e));
            }
        }

        if stats.total_placeholders < total {
            workshop.pause().await;
        }
    }

    logger.info(&format!(
        "📊 {} placeholder(s): {} generated, {} passed, {} removed",
        stats.total_placeholders, stats.generated, stats.passed, stats.removed
    ));
    Ok((kept, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use ab_core::{Error, ImageGenerator};
    use ab_inference::RetryPolicy;
    use ab_storage::MemoryImageCache;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::tempdir;

    /// Fails generation for descriptions containing "broken".
    struct FixedImages;

    #[async_trait]
    impl ImageGenerator for FixedImages {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn generate_image(&self, prompt: &str, _width: u32, _height: u32) -> Result<Vec<u8>> {
            if prompt.contains("broken") {
                Err(Error::Inference("refused".to_string()))
            } else {
                Ok(prompt.as_bytes().to_vec())
            }
        }
    }

    /// Rejects images whose description mentions "blurry".
    struct PickyAuditor;

    #[async_trait]
    impl ImageAuditor for PickyAuditor {
        async fn audit(&self, _image: &[u8], description: &str) -> Result<AuditVerdict> {
            Ok(if description.contains("blurry") {
                AuditVerdict::Fail("out of focus".to_string())
            } else {
                AuditVerdict::Pass
            })
        }
    }

    fn placeholder(id: &str, description: &str) -> Section {
        Section::ImagePlaceholder {
            id: id.to_string(),
            description: description.to_string(),
            position: None,
        }
    }

    #[tokio::test]
    async fn test_pass_fail_and_generation_failure() {
        let dir = tempdir().unwrap();
        let mut config = PipelineConfig::with_data_dir(dir.path());
        config.image_delay = Duration::ZERO;
        config.retry = RetryPolicy::none();
        let workshop = ImageWorkshop::new(Arc::new(FixedImages), Arc::new(MemoryImageCache::new()), &config);

        let sections = vec![
            Section::Paragraph {
                content: "intro".to_string(),
            },
            placeholder("img_1", "sharp city skyline"),
            placeholder("img_2", "blurry city skyline"),
            placeholder("img_3", "broken render"),
        ];

        let (kept, stats) = audit_sections(&workshop, &PickyAuditor, sections).await.unwrap();
        assert_eq!(
            stats,
            ImageStats {
                total_placeholders: 3,
                generated: 2,
                passed: 1,
                failed: 2,
                removed: 2,
            }
        );
        assert_eq!(kept.len(), 2);
        match &kept[1] {
            Section::Image { id, url, audit_status, .. } => {
                assert_eq!(id, "img_1");
                assert_eq!(audit_status, "PASS");
                assert!(url.starts_with("automation/generated_images/img_1_1_"));
            }
            other => panic!("expected image section, got {:?}", other),
        }

        let files: Vec<_> = std::fs::read_dir(&config.image_dir).unwrap().collect();
        assert_eq!(files.len(), 1, "rejected image should be deleted");
    }

    /// Passes the first image it sees and rejects every later one.
    struct FirstOnlyAuditor {
        seen: Mutex<usize>,
    }

    #[async_trait]
    impl ImageAuditor for FirstOnlyAuditor {
        async fn audit(&self, _image: &[u8], _description: &str) -> Result<AuditVerdict> {
            let mut seen = self.seen.lock().unwrap();
            *seen += 1;
            Ok(if *seen == 1 {
                AuditVerdict::Pass
            } else {
                AuditVerdict::Fail("duplicate".to_string())
            })
        }
    }

    #[tokio::test]
    async fn test_repeated_placeholder_does_not_delete_kept_image() {
        let dir = tempdir().unwrap();
        let mut config = PipelineConfig::with_data_dir(dir.path());
        config.image_delay = Duration::ZERO;
        config.retry = RetryPolicy::none();
        let workshop = ImageWorkshop::new(Arc::new(FixedImages), Arc::new(MemoryImageCache::new()), &config);
        let auditor = FirstOnlyAuditor { seen: Mutex::new(0) };

        let sections = vec![placeholder("img_1", "city skyline"), placeholder("img_1", "city skyline")];
        let (kept, stats) = audit_sections(&workshop, &auditor, sections).await.unwrap();
        assert_eq!((stats.passed, stats.removed), (1, 1));

        let url = match &kept[0] {
            Section::Image { url, .. } => url.clone(),
            other => panic!("expected image section, got {:?}", other),
        };
        let name = url.rsplit('/').next().unwrap();
        assert!(config.image_dir.join(name).exists());
    }
}
