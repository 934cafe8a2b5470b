use crate::geo::haversine_km;
use crate::models::catalog::Merchant;
use crate::models::location::GeoPoint;
use crate::models::search::RankedMerchant;

/// Anything that can be visited on a delivery route.
pub trait Located {
    fn location(&self) -> GeoPoint;
}

impl Located for GeoPoint {
    fn location(&self) -> GeoPoint {
        *self
    }
}

impl Located for Merchant {
    fn location(&self) -> GeoPoint {
        self.location
    }
}

impl Located for RankedMerchant {
    fn location(&self) -> GeoPoint {
        self.merchant.location
    }
}

#[derive(Debug, Clone)]
pub struct Route<T> {
    pub stops: Vec<T>,
    pub total_distance_km: f64,
}

/// Greedy nearest-neighbour tour starting at `origin`.
///
/// Each step moves to the closest unvisited stop; on equal distances the
/// earlier stop in `stops` wins. O(n²), not an optimal tour.
pub fn approximate_route<T: Located + Clone>(origin: &GeoPoint, stops: &[T]) -> Route<T> {
    let mut visited = vec![false; stops.len()];
    let mut ordered = Vec::with_capacity(stops.len());
    let mut total_distance_km = 0.0;
    let mut current = *origin;

    for _ in 0..stops.len() {
        let mut nearest: Option<(usize, f64)> = None;

        for (idx, stop) in stops.iter().enumerate() {
            if visited[idx] {
                continue;
            }
            let distance = haversine_km(&current, &stop.location());
            match nearest {
                Some((_, best)) if distance >= best => {}
                _ => nearest = Some((idx, distance)),
            }
        }

        let Some((idx, distance)) = nearest else {
            break;
        };

        visited[idx] = true;
        total_distance_km += distance;
        current = stops[idx].location();
        ordered.push(stops[idx].clone());
    }

    Route {
        stops: ordered,
        total_distance_km,
    }
}
