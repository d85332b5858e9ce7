use anyhow::Context;
use bevy::prelude::*;
use zonemap::{
    ActivateOverlayModel, ClearOverlay, ControllerState, CreateOverlay, DeleteOverlay,
    FillOverlay, Notification, OverlayController, SaveOverlays, SelectOverlayTarget,
    SetBrushSize, SetPaintMode, ZoneMapPlugin, ZoneMapTexture,
};
use zonemap_camera::{OrbitCameraPlugin, OrbitCameraSettings};
use zonemap_catalog::{
    AssetType, Derivative, DerivativeUsage, ModelDerivatives, Quality, Targets, ZoneDocument,
};
use zonemap_raster::{PaintMode, texture::raster_to_image};

/// Document describing the model shown by the viewer.
#[derive(Resource)]
struct ViewerDocument(ZoneDocument);

#[derive(Component)]
struct StatusText;

#[derive(Component)]
struct NotificationText;

/// Zone map shown over [`UnderlayPreview`] in the corner preview.
#[derive(Component)]
struct ZoneMapPreview;

/// The model's base color texture behind the zone map preview.
#[derive(Component)]
struct UnderlayPreview;

fn main() -> anyhow::Result<()> {
    let document = match std::env::args().nth(1) {
        Some(path) => ZoneDocument::load(&path)
            .with_context(|| format!("Failed to open zone document '{path}'"))?,
        None => demo_document(),
    };

    let exit = App::new()
        .add_plugins((DefaultPlugins, OrbitCameraPlugin, ZoneMapPlugin))
        .insert_resource(ViewerDocument(document))
        .add_systems(Startup, (spawn_scene, spawn_hud))
        .add_systems(
            Update,
            (
                handle_shortcuts,
                update_preview,
                update_underlay_preview,
                update_status,
                show_notifications,
            ),
        )
        .run();
    if let AppExit::Error(code) = exit {
        anyhow::bail!("viewer exited with code {code}");
    }
    Ok(())
}

/// A UV sphere with three texture tiers and no targets yet.
fn demo_document() -> ZoneDocument {
    let tier = |quality, size| {
        let mut derivative = Derivative::new(DerivativeUsage::Web3D, quality);
        derivative
            .create_asset(AssetType::Model, format!("sphere-{}.glb", Quality::name(quality)))
            .image_size = Some(size);
        derivative
    };
    ZoneDocument {
        name: "demo-sphere".to_string(),
        derivatives: ModelDerivatives {
            derivatives: vec![
                tier(Quality::Low, 512),
                tier(Quality::Medium, 1024),
                tier(Quality::High, 2048),
            ],
            active_quality: Quality::Medium,
        },
        ..default()
    }
}

fn spawn_scene(
    mut commands: Commands,
    document: Res<ViewerDocument>,
    asset_server: Res<AssetServer>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let document = &document.0;

    commands.spawn((
        Name::new("Camera"),
        Camera3d::default(),
        OrbitCameraSettings {
            radius: 4.0,
            ..default()
        },
        Transform::from_xyz(0.0, 0.0, 4.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.spawn((
        Name::new("Sun"),
        DirectionalLight {
            shadows_enabled: true,
            illuminance: 10000.0,
            ..default()
        },
        Transform::from_xyz(10.0, 20.0, 10.0)
            .with_rotation(Quat::from_euler(EulerRot::XYZ, -0.8, 0.4, 0.0)),
    ));

    let mut model = commands.spawn((
        Name::new(document.name.clone()),
        document.targets.clone(),
        document.derivatives.clone(),
        document.overlay_maps.clone(),
        Transform::default(),
    ));
    if document.model.is_empty() {
        model.insert((
            Mesh3d(meshes.add(Sphere::new(1.0).mesh().uv(64, 32))),
            MeshMaterial3d(materials.add(Color::srgb(0.8, 0.8, 0.75))),
        ));
    } else {
        model.insert(SceneRoot(
            asset_server.load(GltfAssetLabel::Scene(0).from_asset(document.model.clone())),
        ));
    }
    let model = model.id();

    commands.trigger(ActivateOverlayModel { model });
}

fn spawn_hud(mut commands: Commands) {
    commands.spawn((
        StatusText,
        Text::default(),
        TextFont::from_font_size(14.0),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(8.0),
            left: Val::Px(8.0),
            ..default()
        },
    ));
    commands.spawn((
        NotificationText,
        Text::default(),
        TextFont::from_font_size(14.0),
        Node {
            position_type: PositionType::Absolute,
            bottom: Val::Px(8.0),
            left: Val::Px(8.0),
            ..default()
        },
    ));
    let layer = || Node {
        position_type: PositionType::Absolute,
        width: Val::Percent(100.0),
        height: Val::Percent(100.0),
        ..default()
    };
    commands.spawn((
        BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.4)),
        Node {
            position_type: PositionType::Absolute,
            bottom: Val::Px(8.0),
            right: Val::Px(8.0),
            width: Val::Px(192.0),
            height: Val::Px(192.0),
            ..default()
        },
        children![
            (UnderlayPreview, ImageNode::default(), layer()),
            (ZoneMapPreview, ImageNode::default(), layer()),
        ],
    ));
}

fn handle_shortcuts(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut commands: Commands,
    controller: Res<OverlayController>,
    mut models: Query<(&Targets, &mut ModelDerivatives)>,
) {
    let ctrl = keyboard.any_pressed([KeyCode::ControlLeft, KeyCode::ControlRight]);

    if ctrl {
        if keyboard.just_pressed(KeyCode::KeyS) {
            commands.trigger(SaveOverlays);
        }
        return;
    }

    if keyboard.just_pressed(KeyCode::KeyN) {
        commands.trigger(CreateOverlay);
    }
    if keyboard.just_pressed(KeyCode::Delete) {
        commands.trigger(DeleteOverlay);
    }
    if keyboard.just_pressed(KeyCode::KeyF) {
        commands.trigger(FillOverlay);
    }
    if keyboard.just_pressed(KeyCode::KeyC) {
        commands.trigger(ClearOverlay);
    }
    for (key, mode) in [
        (KeyCode::Digit1, PaintMode::Interact),
        (KeyCode::Digit2, PaintMode::Paint),
        (KeyCode::Digit3, PaintMode::Erase),
    ] {
        if keyboard.just_pressed(key) {
            commands.trigger(SetPaintMode(mode));
        }
    }

    let brush_size = controller.style().brush_size;
    if keyboard.just_pressed(KeyCode::BracketLeft) {
        commands.trigger(SetBrushSize(brush_size.saturating_sub(5)));
    }
    if keyboard.just_pressed(KeyCode::BracketRight) {
        commands.trigger(SetBrushSize(brush_size + 5));
    }

    let Some((targets, mut derivatives)) = controller
        .model_entity()
        .and_then(|model| models.get_mut(model).ok())
    else {
        return;
    };
    if keyboard.just_pressed(KeyCode::Tab) {
        commands.trigger(SelectOverlayTarget(targets.next_overlay()));
    }
    if keyboard.just_pressed(KeyCode::KeyQ) {
        let qualities = derivatives.qualities(DerivativeUsage::Web3D);
        let next = qualities
            .iter()
            .position(|&q| q == derivatives.active_quality)
            .map_or(0, |i| (i + 1) % qualities.len());
        if let Some(&quality) = qualities.get(next) {
            derivatives.active_quality = quality;
        }
    }
}

fn update_preview(
    zone_maps: Query<&ZoneMapTexture, Changed<ZoneMapTexture>>,
    controller: Res<OverlayController>,
    mut preview: Query<&mut ImageNode, With<ZoneMapPreview>>,
) {
    let Some(texture) = controller
        .model_entity()
        .and_then(|model| zone_maps.get(model).ok())
    else {
        return;
    };
    let Ok(mut image) = preview.single_mut() else {
        return;
    };
    image.image = texture.0.clone();
}

/// Uploads the active model's underlay once per activation.
fn update_underlay_preview(
    controller: Res<OverlayController>,
    mut shown: Local<Option<Entity>>,
    mut images: ResMut<Assets<Image>>,
    mut preview: Query<&mut ImageNode, With<UnderlayPreview>>,
) {
    let model = controller.model_entity();
    if *shown == model {
        return;
    }
    let Ok(mut node) = preview.single_mut() else {
        return;
    };
    *shown = model;
    node.image = match controller.underlay() {
        Some(underlay) => images.add(raster_to_image(underlay)),
        None => Handle::default(),
    };
}

fn update_status(
    controller: Res<OverlayController>,
    models: Query<(&Targets, &ModelDerivatives)>,
    mut text_query: Query<&mut Text, With<StatusText>>,
) {
    let Ok(mut text) = text_query.single_mut() else {
        return;
    };
    let Some(model) = controller.model() else {
        return;
    };
    let (count, quality) = models
        .get(model.entity)
        .map(|(targets, derivatives)| (targets.len(), derivatives.active_quality.name()))
        .unwrap_or((0, "-"));

    let selection = match controller.state() {
        ControllerState::NoTarget => "no target (N to create)".to_string(),
        ControllerState::TargetSelected { index, mode } => {
            format!("'{}' #{index}  |  {mode:?}", controller.title())
        }
    };
    let style = controller.style();
    let new_text = format!(
        "{}  |  {count} targets  |  {selection}\nColor {}  |  Brush {}  |  Quality {quality}\n\
         N new  Del delete  Tab next  1/2/3 mode  F fill  C clear  [ ] brush  Q quality  Ctrl+S save",
        model.name, style.color, style.brush_size
    );
    if text.0 != new_text {
        text.0 = new_text;
    }
}

fn show_notifications(
    mut notifications: MessageReader<Notification>,
    mut text_query: Query<&mut Text, With<NotificationText>>,
) {
    let Some(last) = notifications.read().last() else {
        return;
    };
    if let Ok(mut text) = text_query.single_mut() {
        text.0 = last.message.clone();
    }
}

#[cfg(test)]
mod tests {
    use zonemap::{ActiveModel, OverlaySettings};
    use zonemap_raster::{RgbaImage, ZoneColor};

    use super::*;

    #[test]
    fn underlay_preview_shows_base_texture_of_active_model() {
        let mut world = World::new();
        world.init_resource::<Assets<Image>>();
        let preview = world.spawn((UnderlayPreview, ImageNode::default())).id();

        let mut controller = OverlayController::new(&OverlaySettings::default());
        let model = world.spawn_empty().id();
        controller.attach_model(
            ActiveModel {
                entity: model,
                name: "statue".to_string(),
            },
            None,
            16,
            &Targets::default(),
        );
        let gray = ZoneColor::rgb(90, 90, 90);
        controller.set_underlay(Some(RgbaImage::from_pixel(8, 8, gray.into())));
        world.insert_resource(controller);

        world.run_system_cached(update_underlay_preview).unwrap();
        let handle = world.get::<ImageNode>(preview).unwrap().image.clone();
        let image = world.resource::<Assets<Image>>().get(&handle).unwrap();
        assert_eq!(image.width(), 8);
        assert_eq!(&image.data.as_ref().unwrap()[..4], &[90, 90, 90, 255]);

        // Same model: nothing is uploaded again.
        world.run_system_cached(update_underlay_preview).unwrap();
        assert_eq!(world.resource::<Assets<Image>>().len(), 1);
    }
}
