//! Read commands: one facade call each, printed as a table or envelope.

use crate::cli::output::output;
use crate::cli::types::{BrandArgs, QueryArgs};
use crate::domain::models::QueryOptions;
use crate::services::DataService;

pub async fn workspaces(service: &DataService, json: bool) -> bool {
    output(&service.workspaces().await, json)
}

pub async fn overview(service: &DataService, args: &QueryArgs, json: bool) -> bool {
    let options = QueryOptions::from(args);
    output(&service.brand_overview(&options).await, json)
}

pub async fn detail(service: &DataService, args: &BrandArgs, json: bool) -> bool {
    let options = QueryOptions::from(&args.query);
    output(&service.brand_detail(&args.brand, &options).await, json)
}

pub async fn narratives(service: &DataService, args: &BrandArgs, json: bool) -> bool {
    let options = QueryOptions::from(&args.query);
    output(&service.narratives(&args.brand, &options).await, json)
}

pub async fn mentions(service: &DataService, args: &BrandArgs, json: bool) -> bool {
    let options = QueryOptions::from(&args.query);
    output(&service.mentions(&args.brand, &options).await, json)
}

pub async fn trends(service: &DataService, args: &BrandArgs, json: bool) -> bool {
    let options = QueryOptions::from(&args.query);
    output(&service.trend_insights(&args.brand, &options).await, json)
}
