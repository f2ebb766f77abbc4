use winit::keyboard::KeyCode;

use crate::input::KeyMap;
use crate::math::Vector2;

/// The player controlled textured quad
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
	/// Center of the quad in window pixels
	pub position: Vector2,
	pub scale: f32,
	/// Size of the source texture in texels
	pub texture_size: Vector2,
	/// Pixels per second
	pub speed: f32,
}

impl Sprite {
	pub fn new(position: Vector2, scale: f32, texture_size: Vector2, speed: f32) -> Self {
		Self {
			position,
			scale,
			texture_size,
			speed,
		}
	}

	/// Size of the quad on screen. The quad covers half of `texture_size * scale`
	pub fn draw_size(&self) -> Vector2 {
		self.texture_size * self.scale / 2.
	}

	/// Distance from the center to the edge of the drawn quad
	pub fn half_extent(&self) -> Vector2 {
		self.texture_size / 2. * self.scale / 2.
	}

	/// Moves with WASD at [Self::speed] and keeps the sprite inside the window
	pub fn process_input(&mut self, keys: &KeyMap, delta: f32, window_size: Vector2) {
		let direction = Vector2::new(
			keys.axis(KeyCode::KeyA, KeyCode::KeyD),
			keys.axis(KeyCode::KeyW, KeyCode::KeyS),
		);
		self.move_by(direction, delta, window_size);
	}

	/// `direction` components are expected in -1..=1 and are not normalized,
	/// diagonal movement is faster like holding two keys always was
	pub fn move_by(&mut self, direction: Vector2, delta: f32, window_size: Vector2) {
		self.position += direction * (self.speed * delta);
		self.clamp_to(window_size);
	}

	/// Keeps the drawn quad inside the window.
	///
	/// When the quad is larger than the window the far edge bound wins.
	pub fn clamp_to(&mut self, window_size: Vector2) {
		let half = self.half_extent();
		self.position.x = self.position.x.max(half.x).min(window_size.x - half.x);
		self.position.y = self.position.y.max(half.y).min(window_size.y - half.y);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::{rng, Rng};
	use winit::event::ElementState;
	use winit::keyboard::PhysicalKey;

	const WINDOW: Vector2 = Vector2::new(1024., 768.);

	fn sprite() -> Sprite {
		// 16x16 texture at scale 5 covers 40x40 pixels
		Sprite::new(Vector2::new(512., 568.), 5., Vector2::new(16., 16.), 300.)
	}

	#[test]
	fn moves_at_speed_times_delta() {
		let mut keys = KeyMap::new();
		keys.handle_key(PhysicalKey::Code(KeyCode::KeyD), ElementState::Pressed);
		keys.handle_key(PhysicalKey::Code(KeyCode::KeyW), ElementState::Pressed);

		let mut sprite = sprite();
		sprite.process_input(&keys, 0.1, WINDOW);
		assert_eq!(sprite.position, Vector2::new(542., 538.));
	}

	#[test]
	fn no_keys_no_movement() {
		let keys = KeyMap::new();
		let mut sprite = sprite();
		sprite.process_input(&keys, 0.05, WINDOW);
		assert_eq!(sprite.position, Vector2::new(512., 568.));
	}

	#[test]
	fn clamps_to_window_edges() {
		let mut sprite = sprite();
		assert_eq!(sprite.half_extent(), Vector2::new(20., 20.));

		sprite.move_by(Vector2::new(-1., -1.), 100., WINDOW);
		assert_eq!(sprite.position, Vector2::new(20., 20.));

		sprite.move_by(Vector2::new(1., 1.), 100., WINDOW);
		assert_eq!(sprite.position, Vector2::new(1004., 748.));
	}

	#[test]
	fn oversized_sprite_sticks_to_far_bound() {
		let mut sprite = Sprite::new(Vector2::new(10., 10.), 100., Vector2::new(64., 64.), 300.);
		sprite.clamp_to(WINDOW);
		// half extent 1600 > window, min(max(x, 1600), 1024 - 1600)
		assert_eq!(sprite.position, Vector2::new(-576., -832.));
	}

	#[test]
	fn random_walk_stays_inside_window() {
		let mut rng = rng();
		let mut sprite = sprite();
		let half = sprite.half_extent();
		(0..500).for_each(|_| {
			let direction = Vector2::new(
				rng.random_range(-1..=1) as f32,
				rng.random_range(-1..=1) as f32,
			);
			sprite.move_by(direction, rng.random_range(0.0..0.05), WINDOW);
			assert!(sprite.position.x >= half.x && sprite.position.x <= WINDOW.x - half.x);
			assert!(sprite.position.y >= half.y && sprite.position.y <= WINDOW.y - half.y);
		});
	}

	#[test]
	fn label_at_top_edge_is_pushed_into_view() {
		// 200x64 padded text texture at scale 3 is drawn 300x96
		let mut label = Sprite::new(Vector2::new(512., 0.), 3., Vector2::new(200., 64.), 0.);
		label.clamp_to(WINDOW);
		assert_eq!(label.position, Vector2::new(512., 48.));
		assert_eq!(label.position.y - label.half_extent().y, 0.);
	}
}
