//! Upload of zone maps, one image per quality tier.
//!
//! Each tier is encoded and uploaded as its own task on the IO pool. A
//! polling system completes the tasks: successful uploads are registered in
//! the model's LOD catalog and every outcome is reported as a notification.

use std::{future::Future, io::Cursor, pin::Pin, sync::Arc};

use bevy::{
    prelude::*,
    tasks::{IoTaskPool, Task, block_on, futures_lite::future},
};
use image::{DynamicImage, RgbaImage};
use thiserror::Error;
use zonemap_catalog::{DerivativeUsage, ModelDerivatives, OverlayMapOptions, Quality};
use zonemap_raster::render_flipped;

use crate::{
    controller::OverlayController,
    events::SaveOverlays,
    notify::Notification,
    settings::{ExportFormat, OverlaySettings},
};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
    #[error("server answered {status} {reason}")]
    Upload { status: u16, reason: String },
    #[error("network error: {0}")]
    Network(String),
}

pub type UploadFuture = Pin<Box<dyn Future<Output = Result<(), ExportError>> + Send>>;

/// Destination of exported zone maps.
pub trait OverlayUploader: Send + Sync + 'static {
    fn put(&self, url: String, content_type: &'static str, bytes: Vec<u8>) -> UploadFuture;
}

/// Uploads with an HTTP `PUT`.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpUploader;

impl OverlayUploader for HttpUploader {
    fn put(&self, url: String, content_type: &'static str, bytes: Vec<u8>) -> UploadFuture {
        let mut request = ehttp::Request::post(url, bytes);
        request.method = "PUT".to_string();
        request.headers.insert("Content-Type", content_type);
        Box::pin(async move {
            let response = ehttp::fetch_async(request)
                .await
                .map_err(ExportError::Network)?;
            if response.ok {
                Ok(())
            } else {
                Err(ExportError::Upload {
                    status: response.status,
                    reason: response.status_text,
                })
            }
        })
    }
}

#[derive(Resource, Clone)]
pub struct Uploader(pub Arc<dyn OverlayUploader>);

impl Default for Uploader {
    fn default() -> Self {
        Self(Arc::new(HttpUploader))
    }
}

/// One tier of an export.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportJob {
    pub model: Entity,
    pub quality: Quality,
    pub image_size: u32,
    pub file_name: String,
    pub url: String,
    /// Whether the tier was displayed when the export started.
    pub active_tier: bool,
}

#[derive(Debug)]
pub struct ExportOutcome {
    pub job: ExportJob,
    pub result: Result<(), ExportError>,
}

#[derive(Resource, Default)]
pub struct PendingExports {
    tasks: Vec<Task<ExportOutcome>>,
}

impl PendingExports {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

pub fn overlay_file_name(model: &str, quality: Quality, format: ExportFormat) -> String {
    format!("{model}-overlaymap-{}.{}", quality.name(), format.extension())
}

fn content_type(format: ExportFormat) -> &'static str {
    match format {
        ExportFormat::Png => "image/png",
        ExportFormat::Jpeg => "image/jpeg",
    }
}

/// One job per configured tier the model has an exact derivative for.
pub fn plan_export(
    model: Entity,
    model_name: &str,
    derivatives: &ModelDerivatives,
    settings: &OverlaySettings,
) -> Vec<ExportJob> {
    let active = derivatives.active().map(|d| d.quality);
    settings
        .export_qualities
        .iter()
        .filter_map(|&quality| {
            let Some(derivative) = derivatives.select_exact(DerivativeUsage::Web3D, quality) else {
                debug!("'{model_name}' has no {} tier, skipping", quality.name());
                return None;
            };
            let Some(image_size) = derivative.image_size() else {
                debug!("{} tier of '{model_name}' has no image size, skipping", quality.name());
                return None;
            };
            let file_name = overlay_file_name(model_name, quality, settings.export_format);
            Some(ExportJob {
                model,
                quality,
                image_size,
                url: settings.asset_url(&file_name),
                file_name,
                active_tier: active == Some(quality),
            })
        })
        .collect()
}

/// Stretches `raster` to `side`, flips it to image orientation and encodes it.
pub fn encode_zone_map(
    raster: &RgbaImage,
    side: u32,
    format: ExportFormat,
) -> Result<Vec<u8>, ExportError> {
    let image = DynamicImage::ImageRgba8(render_flipped(raster, side));
    let image = match format {
        ExportFormat::Png => image,
        ExportFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
    };
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), format.image_format())?;
    Ok(bytes)
}

pub async fn run_export_job(
    job: ExportJob,
    raster: Arc<RgbaImage>,
    format: ExportFormat,
    uploader: Arc<dyn OverlayUploader>,
) -> ExportOutcome {
    let result = match encode_zone_map(&raster, job.image_size, format) {
        Ok(bytes) => uploader.put(job.url.clone(), content_type(format), bytes).await,
        Err(err) => Err(err),
    };
    ExportOutcome { job, result }
}

/// Applies a finished upload to the model's catalog and describes it.
pub fn complete_export(
    outcome: ExportOutcome,
    derivatives: Option<&mut ModelDerivatives>,
    options: Option<&mut OverlayMapOptions>,
) -> Notification {
    let ExportOutcome { job, result } = outcome;
    if let Err(err) = result {
        return Notification::error(format!("Failed to upload image to '{}': {err}", job.url));
    }

    if let Some(derivative) =
        derivatives.and_then(|d| d.select_exact_mut(DerivativeUsage::Web3D, job.quality))
    {
        if derivative.register_zone_map(&job.file_name) {
            debug!("Registered zone map '{}'", job.file_name);
        }
    }
    if job.active_tier {
        if let Some(options) = options {
            options.add_option(&job.file_name);
        }
    }
    Notification::info(format!("Successfully uploaded image to '{}'", job.url))
}

pub(crate) fn on_save_overlays(
    _: On<SaveOverlays>,
    controller: Res<OverlayController>,
    settings: Res<OverlaySettings>,
    uploader: Res<Uploader>,
    derivatives: Query<&ModelDerivatives>,
    mut pending: ResMut<PendingExports>,
    mut notifications: MessageWriter<Notification>,
) {
    let (Some(model), Some(raster)) = (controller.model(), controller.snapshot()) else {
        warn!("Nothing to save: no model is being painted");
        return;
    };
    let Ok(derivatives) = derivatives.get(model.entity) else {
        notifications.write(Notification::error(format!(
            "'{}' has no quality tiers to export",
            model.name
        )));
        return;
    };

    let jobs = plan_export(model.entity, &model.name, derivatives, &settings);
    if jobs.is_empty() {
        notifications.write(Notification::error(format!(
            "'{}' has none of the configured quality tiers",
            model.name
        )));
        return;
    }

    let pool = IoTaskPool::get();
    for job in jobs {
        info!("Exporting {} ({}x{})", job.file_name, job.image_size, job.image_size);
        let task = run_export_job(
            job,
            raster.clone(),
            settings.export_format,
            uploader.0.clone(),
        );
        pending.tasks.push(pool.spawn(task));
    }
}

pub(crate) fn poll_exports(
    mut pending: ResMut<PendingExports>,
    mut models: Query<(Option<&mut ModelDerivatives>, Option<&mut OverlayMapOptions>)>,
    mut notifications: MessageWriter<Notification>,
) {
    pending.tasks.retain_mut(|task| {
        let Some(outcome) = block_on(future::poll_once(task)) else {
            return true;
        };
        let notification = match models.get_mut(outcome.job.model) {
            Ok((derivatives, options)) => complete_export(
                outcome,
                derivatives.map(Mut::into_inner),
                options.map(Mut::into_inner),
            ),
            Err(_) => complete_export(outcome, None, None),
        };
        notifications.write(notification);
        false
    });
}

#[cfg(test)]
mod tests {
    use std::{sync::Mutex, time::Duration};

    use bevy::{ecs::message::Messages, tasks::TaskPool};
    use zonemap_catalog::{AssetType, Derivative, MapType, Targets};
    use zonemap_raster::ZoneColor;

    use super::*;
    use crate::{controller::ActiveModel, notify::NotificationLevel};

    #[derive(Default)]
    struct RecordingUploader {
        fail_with: Option<u16>,
        /// Restricts `fail_with` to URLs containing this text.
        failing_url: Option<&'static str>,
        puts: Mutex<Vec<(String, &'static str, usize)>>,
    }

    impl OverlayUploader for RecordingUploader {
        fn put(&self, url: String, content_type: &'static str, bytes: Vec<u8>) -> UploadFuture {
            let fails = self.failing_url.is_none_or(|part| url.contains(part));
            self.puts.lock().unwrap().push((url, content_type, bytes.len()));
            let result = match self.fail_with.filter(|_| fails) {
                Some(status) => Err(ExportError::Upload {
                    status,
                    reason: "Forbidden".to_string(),
                }),
                None => Ok(()),
            };
            Box::pin(async move { result })
        }
    }

    fn catalog() -> ModelDerivatives {
        let tier = |quality, size| {
            let mut derivative = Derivative::new(DerivativeUsage::Web3D, quality);
            derivative.create_asset(AssetType::Model, "model.glb").image_size = Some(size);
            derivative
        };
        ModelDerivatives {
            derivatives: vec![tier(Quality::Low, 256), tier(Quality::Medium, 512)],
            active_quality: Quality::Medium,
        }
    }

    fn job(quality: Quality, active_tier: bool) -> ExportJob {
        let file_name = overlay_file_name("statue", quality, ExportFormat::Png);
        ExportJob {
            model: Entity::PLACEHOLDER,
            quality,
            image_size: 64,
            url: OverlaySettings::default().asset_url(&file_name),
            file_name,
            active_tier,
        }
    }

    #[test]
    fn file_names_follow_model_and_tier() {
        assert_eq!(
            overlay_file_name("statue", Quality::High, ExportFormat::Png),
            "statue-overlaymap-high.png"
        );
        assert_eq!(
            overlay_file_name("statue", Quality::Low, ExportFormat::Jpeg),
            "statue-overlaymap-low.jpg"
        );
    }

    #[test]
    fn plan_skips_tiers_without_exact_derivative() {
        let jobs = plan_export(
            Entity::PLACEHOLDER,
            "statue",
            &catalog(),
            &OverlaySettings::default(),
        );

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].quality, Quality::Low);
        assert_eq!(jobs[0].image_size, 256);
        assert!(!jobs[0].active_tier);
        assert_eq!(jobs[1].quality, Quality::Medium);
        assert!(jobs[1].active_tier);
        assert_eq!(
            jobs[1].url,
            "http://localhost:8000/statue-overlaymap-medium.png"
        );
    }

    #[test]
    fn encoded_png_is_square_and_flipped() {
        let mut raster = RgbaImage::from_pixel(128, 128, ZoneColor::BACKGROUND.into());
        // Bottom half of the UV square.
        for y in 0..64 {
            for x in 0..128 {
                raster.put_pixel(x, y, ZoneColor::RED.into());
            }
        }

        let bytes = encode_zone_map(&raster, 64, ExportFormat::Png).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();

        assert_eq!(decoded.dimensions(), (64, 64));
        assert_eq!(ZoneColor::from(*decoded.get_pixel(10, 63)), ZoneColor::RED);
        assert_eq!(ZoneColor::from(*decoded.get_pixel(10, 0)), ZoneColor::BACKGROUND);
    }

    #[test]
    fn jpeg_export_drops_alpha() {
        let raster = RgbaImage::from_pixel(16, 16, ZoneColor::RED.into());
        let bytes = encode_zone_map(&raster, 16, ExportFormat::Jpeg).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
    }

    #[test]
    fn job_uploads_encoded_tier() {
        let uploader = Arc::new(RecordingUploader::default());
        let raster = Arc::new(RgbaImage::from_pixel(32, 32, ZoneColor::RED.into()));

        let outcome = block_on(run_export_job(
            job(Quality::Low, false),
            raster,
            ExportFormat::Png,
            uploader.clone(),
        ));

        assert!(outcome.result.is_ok());
        let puts = uploader.puts.lock().unwrap();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].0, "http://localhost:8000/statue-overlaymap-low.png");
        assert_eq!(puts[0].1, "image/png");
        assert!(puts[0].2 > 0);
    }

    #[test]
    fn success_registers_zone_map_and_option_once() {
        let mut derivatives = catalog();
        let mut options = OverlayMapOptions::default();

        for _ in 0..2 {
            let outcome = ExportOutcome {
                job: job(Quality::Medium, true),
                result: Ok(()),
            };
            let notification =
                complete_export(outcome, Some(&mut derivatives), Some(&mut options));
            assert_eq!(notification.level, NotificationLevel::Info);
            assert_eq!(
                notification.message,
                "Successfully uploaded image to 'http://localhost:8000/statue-overlaymap-medium.png'"
            );
        }

        let medium = derivatives
            .select_exact(DerivativeUsage::Web3D, Quality::Medium)
            .unwrap();
        let zone_maps = medium
            .find_assets(AssetType::Image)
            .filter(|a| a.map_type == Some(MapType::Zone))
            .count();
        assert_eq!(zone_maps, 1);
        assert_eq!(options.options, vec!["statue-overlaymap-medium.png".to_string()]);
    }

    #[test]
    fn inactive_tier_is_not_offered_as_option() {
        let mut derivatives = catalog();
        let mut options = OverlayMapOptions::default();
        let outcome = ExportOutcome {
            job: job(Quality::Low, false),
            result: Ok(()),
        };
        complete_export(outcome, Some(&mut derivatives), Some(&mut options));

        assert!(options.options.is_empty());
        assert!(
            derivatives
                .select_exact(DerivativeUsage::Web3D, Quality::Low)
                .unwrap()
                .has_zone_map()
        );
    }

    #[test]
    fn failed_upload_changes_nothing() {
        let uploader = Arc::new(RecordingUploader {
            fail_with: Some(403),
            ..default()
        });
        let raster = Arc::new(RgbaImage::from_pixel(8, 8, ZoneColor::RED.into()));
        let outcome = block_on(run_export_job(
            job(Quality::Medium, true),
            raster,
            ExportFormat::Png,
            uploader,
        ));

        let mut derivatives = catalog();
        let mut options = OverlayMapOptions::default();
        let notification = complete_export(outcome, Some(&mut derivatives), Some(&mut options));

        assert_eq!(notification.level, NotificationLevel::Error);
        assert_eq!(
            notification.message,
            "Failed to upload image to 'http://localhost:8000/statue-overlaymap-medium.png': \
             server answered 403 Forbidden"
        );
        assert!(options.options.is_empty());
        assert!(
            !derivatives
                .select_exact(DerivativeUsage::Web3D, Quality::Medium)
                .unwrap()
                .has_zone_map()
        );
    }

    #[test]
    fn save_reports_each_tier_and_registers_only_successes() {
        IoTaskPool::get_or_init(TaskPool::new);
        let uploader = Arc::new(RecordingUploader {
            fail_with: Some(500),
            failing_url: Some("-low."),
            ..default()
        });

        let mut world = World::new();
        let model = world
            .spawn((catalog(), OverlayMapOptions::default()))
            .id();
        let mut controller = OverlayController::new(&OverlaySettings::default());
        controller.attach_model(
            ActiveModel {
                entity: model,
                name: "statue".to_string(),
            },
            None,
            64,
            &Targets::default(),
        );
        world.insert_resource(controller);
        world.insert_resource(OverlaySettings::default());
        world.insert_resource(Uploader(uploader.clone()));
        world.init_resource::<PendingExports>();
        world.init_resource::<Messages<Notification>>();
        world.add_observer(on_save_overlays);

        world.trigger(SaveOverlays);
        assert_eq!(world.resource::<PendingExports>().len(), 2);

        for _ in 0..500 {
            world.run_system_cached(poll_exports).unwrap();
            if world.resource::<PendingExports>().is_empty() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(world.resource::<PendingExports>().is_empty());
        assert_eq!(uploader.puts.lock().unwrap().len(), 2);

        let mut notifications: Vec<Notification> = world
            .resource_mut::<Messages<Notification>>()
            .drain()
            .collect();
        notifications.sort_by_key(|n| n.level == NotificationLevel::Info);
        assert_eq!(notifications.len(), 2);
        assert_eq!(notifications[0].level, NotificationLevel::Error);
        assert!(notifications[0].message.contains("statue-overlaymap-low.png"));
        assert_eq!(notifications[1].level, NotificationLevel::Info);
        assert!(notifications[1].message.contains("statue-overlaymap-medium.png"));

        let derivatives = world.get::<ModelDerivatives>(model).unwrap();
        let has_zone_map = |quality| {
            derivatives
                .select_exact(DerivativeUsage::Web3D, quality)
                .unwrap()
                .has_zone_map()
        };
        assert!(!has_zone_map(Quality::Low));
        assert!(has_zone_map(Quality::Medium));
        assert_eq!(
            world.get::<OverlayMapOptions>(model).unwrap().options,
            vec!["statue-overlaymap-medium.png".to_string()]
        );
    }
}
