use bevy::{
    input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel},
    prelude::*,
};

pub struct OrbitCameraPlugin;

impl Plugin for OrbitCameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PointerCapture>()
            .add_systems(Update, orbit_camera_system.in_set(OrbitCameraSystems));
    }
}

/// System set of the camera controller, for ordering tools that capture the
/// pointer against it.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrbitCameraSystems;

/// Set while a tool owns the pointer (e.g. a paint stroke). The camera
/// ignores mouse motion and buttons while captured.
#[derive(Resource, Default, Debug)]
pub struct PointerCapture {
    pub captured: bool,
}

/// Settings component placed on the camera entity to enable orbit controls.
///
/// Controls:
/// - Left-click + drag: orbit around the focus point
/// - Right-click + drag: pan the focus point
/// - Scroll wheel: zoom towards/away from the focus point
#[derive(Component)]
pub struct OrbitCameraSettings {
    /// Point the camera orbits around.
    pub focus: Vec3,
    /// Distance from the focus point.
    pub radius: f32,
    /// Orbit sensitivity (radians per pixel).
    pub sensitivity: f32,
    /// Pan speed, scaled by the radius.
    pub pan_speed: f32,
    /// Zoom factor per scroll line.
    pub zoom_speed: f32,
    /// Whether camera controls are enabled. Set to false during UI focus, etc.
    pub enabled: bool,
}

impl Default for OrbitCameraSettings {
    fn default() -> Self {
        Self {
            focus: Vec3::ZERO,
            radius: 5.0,
            sensitivity: 0.005,
            pan_speed: 0.001,
            zoom_speed: 0.1,
            enabled: true,
        }
    }
}

fn orbit_camera_system(
    mouse: Res<ButtonInput<MouseButton>>,
    capture: Res<PointerCapture>,
    mut mouse_motion: MessageReader<MouseMotion>,
    mut scroll_events: MessageReader<MouseWheel>,
    mut camera_query: Query<(&mut OrbitCameraSettings, &mut Transform)>,
) {
    let mut mouse_delta = Vec2::ZERO;
    for motion in mouse_motion.read() {
        mouse_delta += motion.delta;
    }
    let mut scroll = 0.0;
    for event in scroll_events.read() {
        scroll += match event.unit {
            MouseScrollUnit::Line => event.y,
            MouseScrollUnit::Pixel => event.y * 0.01,
        };
    }

    for (mut settings, mut transform) in &mut camera_query {
        if !settings.enabled {
            continue;
        }

        if !capture.captured && mouse_delta != Vec2::ZERO {
            if mouse.pressed(MouseButton::Left) {
                let (mut yaw, mut pitch, _) = transform.rotation.to_euler(EulerRot::YXZ);
                yaw -= mouse_delta.x * settings.sensitivity;
                pitch -= mouse_delta.y * settings.sensitivity;
                pitch = pitch.clamp(
                    -std::f32::consts::FRAC_PI_2 + 0.01,
                    std::f32::consts::FRAC_PI_2 - 0.01,
                );
                transform.rotation = Quat::from_euler(EulerRot::YXZ, yaw, pitch, 0.0);
            } else if mouse.pressed(MouseButton::Right) {
                let scale = settings.radius * settings.pan_speed;
                let right = transform.right().as_vec3();
                let up = transform.up().as_vec3();
                settings.focus += (-right * mouse_delta.x + up * mouse_delta.y) * scale;
            }
        }

        if scroll != 0.0 {
            settings.radius = (settings.radius * (1.0 - scroll * settings.zoom_speed)).clamp(0.05, 1000.0);
        }

        let back = transform.back().as_vec3();
        transform.translation = settings.focus + back * settings.radius;
    }
}
