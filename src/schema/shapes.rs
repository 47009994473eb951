//! Payload contracts for each upstream series.

use super::{Field, Shape};
use crate::shared::SeriesKind;

/// Contract for the given series kind.
pub fn for_kind(kind: SeriesKind) -> Shape {
    match kind {
        SeriesKind::AltcoinSeason => altcoin_season_response(),
        SeriesKind::Dominance => dominance_response(),
    }
}

/// One altcoin season sample. Upstream sends the numeric members as decimal strings.
pub fn altcoin_season_point() -> Shape {
    Shape::object(vec![
        Field::required("name", Shape::String),
        Field::required("altcoinIndex", Shape::String),
        Field::required("altcoinMarketcap", Shape::String),
        Field::required("timestamp", Shape::String),
    ])
}

pub fn dial_config() -> Shape {
    Shape::object(vec![
        Field::required("start", Shape::Number),
        Field::required("end", Shape::Number),
        Field::required("name", Shape::String),
    ])
}

pub fn altcoin_season_response() -> Shape {
    Shape::object(vec![
        Field::required(
            "data",
            Shape::object(vec![
                Field::required("points", Shape::array(altcoin_season_point())),
                Field::required("historicalValues", Shape::record(altcoin_season_point())),
                Field::required("dialConfigs", Shape::array(dial_config())),
            ]),
        ),
        Field::required(
            "status",
            Shape::object(vec![
                Field::required("timestamp", Shape::String),
                Field::required("error_code", Shape::String),
                Field::required("error_message", Shape::String),
                Field::required("elapsed", Shape::String),
                Field::required("credit_count", Shape::Number),
            ]),
        ),
    ])
}

/// One dominance sample: `[bitcoin, ethereum, others]` percentages.
pub fn dominance_point() -> Shape {
    Shape::object(vec![
        Field::required("dominance", Shape::fixed_array(Shape::Number, 3)),
        Field::required("timestamp", Shape::String),
    ])
}

pub fn dominance_response() -> Shape {
    Shape::object(vec![
        Field::required(
            "data",
            Shape::object(vec![Field::required(
                "points",
                Shape::array(dominance_point()),
            )]),
        ),
        Field::required(
            "status",
            Shape::object(vec![
                Field::required("error_code", Shape::String),
                Field::required("error_message", Shape::String),
                Field::optional("timestamp", Shape::String),
                Field::optional("elapsed", Shape::String),
                Field::optional("credit_count", Shape::Number),
            ]),
        ),
    ])
}
