use serde::{Deserialize, Serialize};

use crate::errors::SGError;

///
/// Axis aligned domain [lower_d, upper_d] onto which the unit cube is mapped.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox
{
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl BoundingBox
{
    #[inline]
    pub fn new(lower: &[f64], upper: &[f64]) -> Result<Self, SGError>
    {
        if lower.len() != upper.len()
        {
            return Err(SGError::DimensionMismatch { expected: lower.len(), found: upper.len() });
        }
        let r = Self { lower: lower.to_vec(), upper: upper.to_vec() };
        r.validate()?;
        Ok(r)
    }

    /// Unit cube.
    pub fn with_dim(num_inputs: usize) -> Self
    {
        Self { lower: vec![0.0; num_inputs], upper: vec![1.0; num_inputs] }
    }

    #[inline]
    pub fn dim(&self) -> usize
    {
        self.lower.len()
    }

    #[inline]
    pub fn width(&self, dim: usize) -> f64
    {
        self.upper[dim] - self.lower[dim]
    }

    ///
    /// Volume of the box (width(0) * ... * width(d - 1)).
    ///
    #[inline]
    pub fn volume(&self) -> f64
    {
        (0..self.dim()).map(|d| self.width(d)).product()
    }

    pub fn is_unit_cube(&self) -> bool
    {
        self.lower.iter().all(|&l| l == 0.0) && self.upper.iter().all(|&u| u == 1.0)
    }

    pub fn validate(&self) -> Result<(), SGError>
    {
        for d in 0..self.dim()
        {
            let width = self.width(d);
            if !width.is_finite() || width <= 0.0
            {
                return Err(SGError::InvalidPoint { point: format!("[{}, {}]", self.lower[d], self.upper[d]), reason: "bounding box interval must have positive finite width" });
            }
        }
        Ok(())
    }

    #[inline]
    pub fn to_unit_coordinate(&self, point: &[f64]) -> Vec<f64>
    {
        point.iter().enumerate().map(|(d, &x)| (x - self.lower[d]) / self.width(d)).collect()
    }

    #[inline]
    pub fn to_real_coordinate(&self, point: &[f64]) -> Vec<f64>
    {
        point.iter().enumerate().map(|(d, &x)| self.lower[d] + self.width(d) * x).collect()
    }

    pub fn contains(&self, point: &[f64]) -> bool
    {
        point.iter().enumerate().all(|(d, &x)| x >= self.lower[d] && x <= self.upper[d])
    }
}

#[test]
fn check_coordinate_mapping()
{
    let bbox = BoundingBox::new(&[-1.0, 2.0], &[1.0, 6.0]).unwrap();
    assert_eq!(bbox.volume(), 8.0);
    assert_eq!(bbox.to_real_coordinate(&[0.5, 0.25]), vec![0.0, 3.0]);
    assert_eq!(bbox.to_unit_coordinate(&[0.0, 3.0]), vec![0.5, 0.25]);
    assert!(bbox.contains(&[1.0, 6.0]));
    assert!(!bbox.contains(&[1.5, 6.0]));
    assert!(!bbox.is_unit_cube());
    assert!(BoundingBox::with_dim(3).is_unit_cube());
}

#[test]
fn check_invalid_bounding_box()
{
    assert!(BoundingBox::new(&[0.0], &[0.0]).is_err());
    assert_eq!(BoundingBox::new(&[0.0, 0.0], &[1.0]).unwrap_err(), SGError::DimensionMismatch { expected: 2, found: 1 });
}
