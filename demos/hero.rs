use bevy::prelude::*;
use bevy_density_surface::{
    DensitySurfacePlugin,
    plugin::{SurfaceTheme, SurfaceView},
    renderer::SurfaceConfig,
    theme::Theme,
};

fn main() {
    App::new()
        .add_plugins((
            DefaultPlugins,
            DensitySurfacePlugin { theme: Theme::Dark },
        ))
        .add_systems(Startup, setup)
        .add_systems(Update, (toggle_theme, despawn_on_escape))
        .run();
}

fn setup(mut commands: Commands) {
    commands.spawn(Camera2d);

    match SurfaceView::new(SurfaceConfig::default()) {
        Ok(view) => {
            commands.spawn(view);
        }
        Err(err) => error!("could not build the surface: {err}"),
    }
}

/// `T` switches between the dark and light palettes.
fn toggle_theme(keyboard: Res<ButtonInput<KeyCode>>, mut theme: ResMut<SurfaceTheme>) {
    if keyboard.just_pressed(KeyCode::KeyT) {
        theme.0 = theme.0.toggled();
    }
}

/// `Escape` tears the surface down; its loop stops with it.
fn despawn_on_escape(
    mut commands: Commands,
    keyboard: Res<ButtonInput<KeyCode>>,
    views: Query<Entity, With<SurfaceView>>,
) {
    if keyboard.just_pressed(KeyCode::Escape) {
        for entity in views.iter() {
            commands.entity(entity).despawn();
        }
    }
}
