use std::collections::BTreeSet;

use crate::models::Operation;

/// Listing filters the search must match
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Feature {
    Elevator,
    AirConditioning,
    GoodPreservation,
}

impl Feature {
    fn param(&self) -> (&'static str, &'static str) {
        match self {
            Feature::Elevator => ("elevator", "true"),
            Feature::AirConditioning => ("airConditioning", "true"),
            Feature::GoodPreservation => ("preservation", "good"),
        }
    }
}

/// Search parameters for one API call
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub radius_meters: u32,
    pub property_category: &'static str,
    pub min_size: u32,
    pub max_size: u32,
    pub required_features: BTreeSet<Feature>,
    pub operation: Operation,
    pub page_number: u32,
}

impl SearchConfig {
    pub const COUNTRY: &'static str = "es";
    pub const MAX_ITEMS: u32 = 50;

    /// Valencia city center, 1500 m around it, 100-160 m² homes
    pub fn valencia(operation: Operation) -> Self {
        Self {
            center_latitude: 39.4693441,
            center_longitude: -0.379561,
            radius_meters: 1500,
            property_category: "homes",
            min_size: 100,
            max_size: 160,
            required_features: BTreeSet::from([
                Feature::Elevator,
                Feature::AirConditioning,
                Feature::GoodPreservation,
            ]),
            operation,
            page_number: 1,
        }
    }

    /// Same search, different page. Pages are 1-based.
    pub fn for_page(&self, page_number: u32) -> Self {
        assert!(page_number >= 1, "page numbers start at 1, got {}", page_number);
        Self {
            page_number,
            ..self.clone()
        }
    }

    /// Query string parameters in a stable order
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        assert!(self.page_number >= 1, "page numbers start at 1, got {}", self.page_number);

        let mut params = vec![
            ("operation", self.operation.as_str().to_string()),
            ("maxItems", Self::MAX_ITEMS.to_string()),
            ("order", "distance".to_string()),
            (
                "center",
                format!("{},{}", self.center_latitude, self.center_longitude),
            ),
            ("distance", self.radius_meters.to_string()),
            ("propertyType", self.property_category.to_string()),
            ("sort", "asc".to_string()),
            ("minSize", self.min_size.to_string()),
            ("maxSize", self.max_size.to_string()),
            ("numPage", self.page_number.to_string()),
        ];
        for feature in &self.required_features {
            let (name, value) = feature.param();
            params.push((name, value.to_string()));
        }
        params.push(("language", "en".to_string()));
        params
    }
}
