use crate::math::Vector2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bullet {
	pub position: Vector2,
	/// Pixels per frame
	pub velocity: Vector2,
}

/// A fixed set of bullets fired once and integrated every frame.
///
/// Bullets are never removed, they keep flying past the window edge.
#[derive(Debug, Clone, Default)]
pub struct BulletPattern {
	bullets: Vec<Bullet>,
}

impl BulletPattern {
	/// `count` bullets leaving `center` at evenly spaced angles, the first
	/// one heading along +x
	pub fn radial(count: usize, speed: f32, center: Vector2) -> Self {
		let step = 2. * std::f32::consts::PI / count.max(1) as f32;
		let bullets = (0..count)
			.map(|i| Bullet {
				position: center,
				velocity: Vector2::rotation(i as f32 * step) * speed,
			})
			.collect();
		Self { bullets }
	}

	/// Advances every bullet by its velocity. Called once per frame.
	pub fn update(&mut self) {
		self.bullets
			.iter_mut()
			.for_each(|bullet| bullet.position += bullet.velocity);
	}

	pub fn bullets(&self) -> &[Bullet] {
		&self.bullets
	}

	pub fn len(&self) -> usize {
		self.bullets.len()
	}

	pub fn is_empty(&self) -> bool {
		self.bullets.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn assert_close(a: Vector2, b: Vector2) {
		assert!((a - b).mag() < 1e-4, "{a:?} != {b:?}");
	}

	#[test]
	fn four_bullets_point_along_axes() {
		let center = Vector2::new(512., 384.);
		let pattern = BulletPattern::radial(4, 1., center);
		let velocities = pattern.bullets().iter().map(|x| x.velocity).collect::<Vec<_>>();

		assert_eq!(pattern.len(), 4);
		assert_close(velocities[0], Vector2::new(1., 0.));
		assert_close(velocities[1], Vector2::new(0., 1.));
		assert_close(velocities[2], Vector2::new(-1., 0.));
		assert_close(velocities[3], Vector2::new(0., -1.));
		assert!(pattern.bullets().iter().all(|x| x.position == center));
	}

	#[test]
	fn update_integrates_once_per_call() {
		let mut pattern = BulletPattern::radial(8, 2., Vector2::ZERO);
		for _ in 0..60 {
			pattern.update();
		}
		for bullet in pattern.bullets() {
			assert!((bullet.position - bullet.velocity * 60.).mag() < 1e-2);
			assert!((bullet.position.mag() - 120.).abs() < 1e-2);
		}
	}

	#[test]
	fn empty_pattern_is_valid() {
		let mut pattern = BulletPattern::radial(0, 1., Vector2::ZERO);
		pattern.update();
		assert!(pattern.is_empty());
	}
}
