use std::ops::{Index, IndexMut};

use soil_geom::Vec3;

use crate::field::Field2;
use crate::grid::Grid;

/// Closed height interval `[min, max]` occupied by the body or by soil.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Span {
    pub min: f64,
    pub max: f64,
}

impl Span {
    #[inline]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn height(self) -> f64 {
        self.max - self.min
    }
}

/// One of the two interval slots a column can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Layer {
    First,
    Second,
}

impl Layer {
    pub const ALL: [Layer; 2] = [Layer::First, Layer::Second];

    #[inline]
    pub fn other(self) -> Layer {
        match self {
            Layer::First => Layer::Second,
            Layer::Second => Layer::First,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Layer::First => 0,
            Layer::Second => 1,
        }
    }
}

/// Two layers of optional intervals per column.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerField {
    layers: [Field2<Option<Span>>; 2],
}

impl LayerField {
    pub fn new(nx: usize, ny: usize) -> Self {
        Self {
            layers: [Field2::new(nx, ny), Field2::new(nx, ny)],
        }
    }

    #[inline]
    pub fn get(&self, layer: Layer, ii: usize, jj: usize) -> Option<Span> {
        self.layers[layer.index()][(ii, jj)]
    }

    #[inline]
    pub fn set(&mut self, layer: Layer, ii: usize, jj: usize, span: Option<Span>) {
        self.layers[layer.index()][(ii, jj)] = span;
    }

    /// True when neither layer holds an interval at the column.
    #[inline]
    pub fn is_empty_at(&self, ii: usize, jj: usize) -> bool {
        self.get(Layer::First, ii, jj).is_none() && self.get(Layer::Second, ii, jj).is_none()
    }

    /// Empties both layers over `area`.
    pub fn clear_area(&mut self, area: Area) {
        for (ii, jj) in area.cells() {
            self.set(Layer::First, ii, jj, None);
            self.set(Layer::Second, ii, jj, None);
        }
    }

    pub fn clear(&mut self) {
        for layer in &mut self.layers {
            layer.fill(None);
        }
    }
}

impl Index<Layer> for LayerField {
    type Output = Field2<Option<Span>>;
    #[inline]
    fn index(&self, layer: Layer) -> &Self::Output {
        &self.layers[layer.index()]
    }
}

impl IndexMut<Layer> for LayerField {
    #[inline]
    fn index_mut(&mut self, layer: Layer) -> &mut Self::Output {
        &mut self.layers[layer.index()]
    }
}

impl Index<(Layer, usize, usize)> for LayerField {
    type Output = Option<Span>;
    #[inline]
    fn index(&self, (layer, ii, jj): (Layer, usize, usize)) -> &Option<Span> {
        &self.layers[layer.index()][(ii, jj)]
    }
}

impl IndexMut<(Layer, usize, usize)> for LayerField {
    #[inline]
    fn index_mut(&mut self, (layer, ii, jj): (Layer, usize, usize)) -> &mut Option<Span> {
        &mut self.layers[layer.index()][(ii, jj)]
    }
}

/// Journal entry for a parcel of soil resting on the body.
///
/// `pos` is expressed in the body frame so the parcel can follow the body
/// when its pose changes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodySoil {
    pub layer: Layer,
    pub ii: usize,
    pub jj: usize,
    pub pos: Vec3,
    pub h_soil: f64,
}

/// Half-open index rectangle `[min_x, max_x) x [min_y, max_y)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Area {
    pub min_x: usize,
    pub max_x: usize,
    pub min_y: usize,
    pub max_y: usize,
}

impl Area {
    /// Every column that has four lateral neighbours on the grid.
    pub fn interior(grid: &Grid) -> Self {
        Self {
            min_x: 1,
            max_x: 2 * grid.half_length_x,
            min_y: 1,
            max_y: 2 * grid.half_length_y,
        }
    }

    pub fn union(self, other: Area) -> Area {
        Area {
            min_x: self.min_x.min(other.min_x),
            max_x: self.max_x.max(other.max_x),
            min_y: self.min_y.min(other.min_y),
            max_y: self.max_y.max(other.max_y),
        }
    }

    #[inline]
    pub fn contains(self, ii: usize, jj: usize) -> bool {
        (self.min_x..self.max_x).contains(&ii) && (self.min_y..self.max_y).contains(&jj)
    }

    pub fn cells(self) -> impl Iterator<Item = (usize, usize)> {
        (self.min_x..self.max_x).flat_map(move |ii| (self.min_y..self.max_y).map(move |jj| (ii, jj)))
    }
}

/// Mutable simulation state, sized from the grid.
#[derive(Clone, Debug)]
pub struct SimOut {
    pub equilibrium: bool,
    pub terrain: Field2<f64>,
    pub body: LayerField,
    pub body_soil: LayerField,
    pub body_soil_pos: Vec<BodySoil>,
    pub body_area: Area,
    pub relax_area: Area,
    pub impact_area: Area,
}

impl SimOut {
    pub fn new(grid: &Grid) -> Self {
        let (nx, ny) = (grid.size_x(), grid.size_y());
        let area = Area::interior(grid);
        Self {
            equilibrium: false,
            terrain: Field2::new(nx, ny),
            body: LayerField::new(nx, ny),
            body_soil: LayerField::new(nx, ny),
            body_soil_pos: Vec::new(),
            body_area: area,
            relax_area: area,
            impact_area: area,
        }
    }

    /// Total soil volume: terrain plus every body-soil interval.
    pub fn soil_volume(&self, grid: &Grid) -> f64 {
        let terrain: f64 = self.terrain.iter().sum();
        let body_soil: f64 = Layer::ALL
            .iter()
            .flat_map(|&layer| self.body_soil[layer].iter())
            .flatten()
            .map(|s| s.height())
            .sum();
        grid.cell_area * (terrain + body_soil)
    }
}
