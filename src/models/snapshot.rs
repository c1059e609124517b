use crate::entities::{customer, employee, order, route};
use serde::Serialize;
use utoipa::ToSchema;

/// Names and codes copied onto an order when it is captured.
///
/// Later master-data edits never change what an order says about its
/// customer, route or salesperson, so the fields are only readable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct OrderSnapshot {
    customer_name: String,
    customer_code: String,
    route_name: String,
    route_code: Option<String>,
    salesperson_name: String,
    salesperson_code: String,
}

impl OrderSnapshot {
    pub fn capture(
        customer: &customer::Model,
        route: &route::Model,
        salesperson: &employee::Model,
    ) -> Self {
        Self {
            customer_name: customer.name.clone(),
            customer_code: customer.code.clone(),
            route_name: route.name.clone(),
            route_code: route.code.clone(),
            salesperson_name: salesperson.name.clone(),
            salesperson_code: salesperson.code.clone(),
        }
    }

    pub fn from_model(model: &order::Model) -> Self {
        Self {
            customer_name: model.customer_name.clone(),
            customer_code: model.customer_code.clone(),
            route_name: model.route_name.clone(),
            route_code: model.route_code.clone(),
            salesperson_name: model.salesperson_name.clone(),
            salesperson_code: model.salesperson_code.clone(),
        }
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn customer_code(&self) -> &str {
        &self.customer_code
    }

    pub fn route_name(&self) -> &str {
        &self.route_name
    }

    pub fn route_code(&self) -> Option<&str> {
        self.route_code.as_deref()
    }

    pub fn salesperson_name(&self) -> &str {
        &self.salesperson_name
    }

    pub fn salesperson_code(&self) -> &str {
        &self.salesperson_code
    }
}
