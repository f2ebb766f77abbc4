use bytemuck::{Pod, Zeroable};
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};

/// 2D vector in window pixels (x right, y down)
///
/// `#[repr(C)]` so it can be written straight into vertex and uniform buffers
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vector2 {
	pub x: f32,
	pub y: f32,
}

impl Vector2 {
	pub const ZERO: Self = Self::new(0., 0.);

	pub const fn new(x: f32, y: f32) -> Self {
		Self { x, y }
	}

	/// Unit vector pointing at `angle` radians from the +x axis
	pub fn rotation(angle: f32) -> Self {
		Self::new(angle.cos(), angle.sin())
	}

	pub fn dot(self, other: Self) -> f32 {
		self.x * other.x + self.y * other.y
	}

	pub fn mag(self) -> f32 {
		self.dot(self).sqrt()
	}

	pub fn into_inner(self) -> [f32; 2] {
		[self.x, self.y]
	}
}

impl From<[f32; 2]> for Vector2 {
	fn from([x, y]: [f32; 2]) -> Self {
		Self::new(x, y)
	}
}

impl From<Vector2> for [f32; 2] {
	fn from(value: Vector2) -> Self {
		value.into_inner()
	}
}

impl Add for Vector2 {
	type Output = Self;
	fn add(self, other: Self) -> Self {
		Self::new(self.x + other.x, self.y + other.y)
	}
}

impl AddAssign for Vector2 {
	fn add_assign(&mut self, other: Self) {
		*self = *self + other;
	}
}

impl Sub for Vector2 {
	type Output = Self;
	fn sub(self, other: Self) -> Self {
		Self::new(self.x - other.x, self.y - other.y)
	}
}

impl SubAssign for Vector2 {
	fn sub_assign(&mut self, other: Self) {
		*self = *self - other;
	}
}

impl Mul<f32> for Vector2 {
	type Output = Self;
	fn mul(self, other: f32) -> Self {
		Self::new(self.x * other, self.y * other)
	}
}

impl Mul<Vector2> for Vector2 {
	type Output = Self;
	fn mul(self, other: Self) -> Self {
		Self::new(self.x * other.x, self.y * other.y)
	}
}

impl Div<f32> for Vector2 {
	type Output = Self;
	fn div(self, other: f32) -> Self {
		Self::new(self.x / other, self.y / other)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::{rng, Rng};

	#[test]
	fn add_sub_match_componentwise() {
		let mut rng = rng();
		(0..200).for_each(|_| {
			let x: [f32; 2] = rng.random();
			let y: [f32; 2] = rng.random();

			let sum = Vector2::from(x) + Vector2::from(y);
			assert_eq!(sum.into_inner(), [x[0] + y[0], x[1] + y[1]]);

			let diff = Vector2::from(x) - Vector2::from(y);
			assert_eq!(diff.into_inner(), [x[0] - y[0], x[1] - y[1]]);
		});
	}

	#[test]
	fn add_assign_accumulates() {
		let mut position = Vector2::new(512., 384.);
		let velocity = Vector2::new(1., -0.5);
		for _ in 0..10 {
			position += velocity;
		}
		assert_eq!(position, Vector2::new(522., 379.));
	}

	#[test]
	fn rotation_is_unit_length() {
		let mut rng = rng();
		(0..200).for_each(|_| {
			let angle: f32 = rng.random_range(-10.0..10.0);
			assert!((Vector2::rotation(angle).mag() - 1.).abs() < 1e-5);
		});
	}

	#[test]
	fn layout_matches_two_floats() {
		assert_eq!(std::mem::size_of::<Vector2>(), 8);
		let vector = Vector2::new(1., 2.);
		let floats = [1f32, 2f32];
		assert_eq!(bytemuck::bytes_of(&vector), bytemuck::bytes_of(&floats));
	}
}
