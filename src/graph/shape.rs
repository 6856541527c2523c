//! Borrowed view over an edge's intermediate points

use crate::geo::Coordinate;

/// Shape points of one edge, optionally read back to front
///
/// Edges are stored once; enumerating from the `to` side hands out the
/// same points reversed.
#[derive(Debug, Clone, Copy)]
pub struct Shape<'a> {
    points: &'a [Coordinate],
    reversed: bool,
}

impl<'a> Shape<'a> {
    pub fn new(points: &'a [Coordinate]) -> Self {
        Self {
            points,
            reversed: false,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn get(&self, i: usize) -> Option<Coordinate> {
        if i >= self.points.len() {
            return None;
        }
        if self.reversed {
            Some(self.points[self.points.len() - 1 - i])
        } else {
            Some(self.points[i])
        }
    }

    pub fn first(&self) -> Option<Coordinate> {
        self.get(0)
    }

    pub fn last(&self) -> Option<Coordinate> {
        self.points.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// The same points in the opposite direction
    pub fn reverse(self) -> Self {
        Self {
            points: self.points,
            reversed: !self.reversed,
        }
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Coordinate> + ExactSizeIterator + 'a {
        let points = self.points;
        let reversed = self.reversed;
        let len = points.len();
        (0..len).map(move |i| if reversed { points[len - 1 - i] } else { points[i] })
    }

    pub fn to_vec(&self) -> Vec<Coordinate> {
        self.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reversed_view() {
        let points = [
            Coordinate::new(1.0, 1.0),
            Coordinate::new(2.0, 2.0),
            Coordinate::new(3.0, 3.0),
        ];
        let shape = Shape::new(&points);
        assert_eq!(shape.first(), Some(points[0]));

        let reversed = shape.reverse();
        assert!(reversed.is_reversed());
        assert_eq!(reversed.first(), Some(points[2]));
        assert_eq!(reversed.last(), Some(points[0]));
        assert_eq!(reversed.get(3), None);
        assert_eq!(reversed.to_vec(), vec![points[2], points[1], points[0]]);
        assert_eq!(reversed.reverse().to_vec(), points.to_vec());
    }

    #[test]
    fn test_empty_shape() {
        let shape = Shape::new(&[]);
        assert!(shape.is_empty());
        assert_eq!(shape.first(), None);
        assert_eq!(shape.last(), None);
    }
}
