pub mod action;
pub mod history_record;
pub mod observation;
pub mod price_point;
pub mod price_series;
