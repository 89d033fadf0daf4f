use actix_web::{delete, get, patch, post, put, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::history::HistoryFilter;
use crate::ledger::BudgetUsage;
use crate::schemas::{Category, CategoryForm, ExpenseForm, ExpensePatchForm, GroupForm};
use crate::service::BudgetService;

/// Header naming the member acting on the request.
pub const MEMBER_HEADER: &str = "X-Member";

type Service = web::Data<BudgetService>;
type Reply = Result<HttpResponse, LedgerError>;

#[derive(Deserialize, Serialize)]
struct BudgetJson {
    amount: String,
}

#[derive(Deserialize, Serialize)]
struct BulkDeleteJson {
    ids: Vec<String>,
}

#[derive(Deserialize, Serialize, Default)]
struct SettleJson {
    /// Defaults to the acting member.
    #[serde(default)]
    member: Option<String>,
}

#[derive(Deserialize)]
struct CategoryQuery {
    group_id: Option<String>,
}

#[derive(Deserialize)]
struct HistoryQuery {
    filter: Option<String>,
}

#[derive(Serialize)]
struct CategoryView {
    #[serde(flatten)]
    category: Category,
    usage: BudgetUsage,
}

impl TryFrom<Category> for CategoryView {
    type Error = LedgerError;

    fn try_from(mut category: Category) -> Result<Self, Self::Error> {
        let usage = category.usage()?;
        category.expenses = category
            .expenses_newest_first()
            .into_iter()
            .cloned()
            .collect();
        Ok(CategoryView { category, usage })
    }
}

fn actor(request: &HttpRequest, service: &BudgetService) -> String {
    request
        .headers()
        .get(MEMBER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(service.local_member())
        .to_string()
}

#[get("/groups")]
async fn list_groups(service: Service) -> Reply {
    Ok(HttpResponse::Ok().json(service.list_groups().await?))
}

#[post("/groups")]
async fn create_group(service: Service, json: web::Json<GroupForm>) -> Reply {
    let group = service.create_group(json.into_inner()).await?;
    Ok(HttpResponse::Created().json(group))
}

#[get("/groups/{id}")]
async fn get_group(service: Service, id: web::Path<String>) -> Reply {
    Ok(HttpResponse::Ok().json(service.get_group(&id).await?))
}

#[get("/groups/{id}/summary")]
async fn group_summary(service: Service, id: web::Path<String>) -> Reply {
    Ok(HttpResponse::Ok().json(service.group_summary(&id).await?))
}

#[get("/groups/{id}/exchanges")]
async fn group_exchanges(service: Service, id: web::Path<String>) -> Reply {
    Ok(HttpResponse::Ok().json(service.group_settlements(&id).await?))
}

#[get("/categories")]
async fn list_categories(service: Service, query: web::Query<CategoryQuery>) -> Reply {
    let categories = service.list_categories(query.group_id.as_deref()).await?;
    let views = categories
        .into_iter()
        .map(CategoryView::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(HttpResponse::Ok().json(views))
}

#[post("/categories")]
async fn create_category(service: Service, json: web::Json<CategoryForm>) -> Reply {
    let category = service.create_category(json.into_inner()).await?;
    Ok(HttpResponse::Created().json(CategoryView::try_from(category)?))
}

#[get("/categories/{id}")]
async fn get_category(service: Service, id: web::Path<String>) -> Reply {
    let category = service.get_category(&id).await?;
    Ok(HttpResponse::Ok().json(CategoryView::try_from(category)?))
}

#[delete("/categories/{id}")]
async fn delete_category(service: Service, id: web::Path<String>) -> Reply {
    service.delete_category(&id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/categories/{id}/expenses")]
async fn add_expense(
    service: Service,
    id: web::Path<String>,
    expense: web::Json<ExpenseForm>,
) -> Reply {
    let expense = service.add_expense(&id, expense.into_inner()).await?;
    Ok(HttpResponse::Created().json(expense))
}

#[post("/categories/{id}/budget/adjust")]
async fn adjust_budget(service: Service, id: web::Path<String>, json: web::Json<BudgetJson>) -> Reply {
    let category = service.adjust_budget(&id, &json.amount).await?;
    Ok(HttpResponse::Ok().json(CategoryView::try_from(category)?))
}

#[put("/categories/{id}/budget")]
async fn set_budget(service: Service, id: web::Path<String>, json: web::Json<BudgetJson>) -> Reply {
    let category = service.set_budget(&id, &json.amount).await?;
    Ok(HttpResponse::Ok().json(CategoryView::try_from(category)?))
}

#[get("/categories/{id}/balance")]
async fn category_balance(service: Service, id: web::Path<String>) -> Reply {
    Ok(HttpResponse::Ok().json(service.category_settlements(&id).await?.balance))
}

#[get("/categories/{id}/exchanges")]
async fn category_exchanges(service: Service, id: web::Path<String>) -> Reply {
    Ok(HttpResponse::Ok().json(service.category_settlements(&id).await?.exchanges))
}

#[patch("/expenses/{id}")]
async fn edit_expense(
    service: Service,
    id: web::Path<String>,
    json: web::Json<ExpensePatchForm>,
) -> Reply {
    Ok(HttpResponse::Ok().json(service.edit_expense(&id, json.into_inner()).await?))
}

#[delete("/expenses/{id}")]
async fn delete_expense(service: Service, id: web::Path<String>) -> Reply {
    service.delete_expense(&id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/expenses/bulk-delete")]
async fn bulk_delete_expenses(service: Service, json: web::Json<BulkDeleteJson>) -> Reply {
    let removed = service.bulk_delete_expenses(&json.ids).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "removed": removed })))
}

#[get("/expenses/{id}/split")]
async fn expense_split(request: HttpRequest, service: Service, id: web::Path<String>) -> Reply {
    let viewer = actor(&request, &service);
    Ok(HttpResponse::Ok().json(service.expense_split(&id, &viewer).await?))
}

#[post("/expenses/{id}/settle")]
async fn settle_share(
    request: HttpRequest,
    service: Service,
    id: web::Path<String>,
    json: Option<web::Json<SettleJson>>,
) -> Reply {
    let actor = actor(&request, &service);
    let member = json
        .and_then(|json| json.into_inner().member)
        .unwrap_or_else(|| actor.clone());
    service.settle_share(&actor, &id, &member).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/expenses/{id}/settled/{member}")]
async fn toggle_settled(
    request: HttpRequest,
    service: Service,
    path: web::Path<(String, String)>,
) -> Reply {
    let actor = actor(&request, &service);
    let (id, member) = path.into_inner();
    let state = service.toggle_settled(&actor, &id, &member).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "member": member, "state": state })))
}

#[get("/history")]
async fn history(request: HttpRequest, service: Service, query: web::Query<HistoryQuery>) -> Reply {
    let filter: HistoryFilter = match &query.filter {
        Some(filter) => filter.parse()?,
        None => HistoryFilter::All,
    };
    let viewer = actor(&request, &service);
    Ok(HttpResponse::Ok().json(service.history(&viewer, filter).await?))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_groups)
        .service(create_group)
        .service(get_group)
        .service(group_summary)
        .service(group_exchanges)
        .service(list_categories)
        .service(create_category)
        .service(get_category)
        .service(delete_category)
        .service(add_expense)
        .service(adjust_budget)
        .service(set_budget)
        .service(category_balance)
        .service(category_exchanges)
        .service(bulk_delete_expenses)
        .service(edit_expense)
        .service(delete_expense)
        .service(expense_split)
        .service(settle_share)
        .service(toggle_settled)
        .service(history);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use actix_web::{http::StatusCode, test, App};
    use serde_json::Value;

    use crate::memory::InMemoryStore;
    use crate::seed::load_demo;

    async fn demo_service() -> web::Data<BudgetService> {
        let store = Arc::new(InMemoryStore::new());
        load_demo(store.as_ref()).await.unwrap();
        web::Data::new(BudgetService::new(store, "You"))
    }

    #[actix_web::test]
    async fn category_view_carries_usage() {
        let app = test::init_service(
            App::new()
                .app_data(demo_service().await)
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get().uri("/categories/g1").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["name"], "Groceries");
        assert_eq!(body["total_spent"], "8050");
        assert_eq!(body["usage"]["level"], "critical");
        assert_eq!(body["expenses"][0]["id"], "exp1");
        assert_eq!(body["expenses"][3]["id"], "exp4");
    }

    #[actix_web::test]
    async fn missing_category_is_404() {
        let app = test::init_service(
            App::new()
                .app_data(demo_service().await)
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::get().uri("/categories/nope").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn settling_for_someone_else_is_forbidden() {
        let app = test::init_service(
            App::new()
                .app_data(demo_service().await)
                .configure(configure),
        )
        .await;
        // exp2 was paid by Maria; John may not settle for Luis.
        let req = test::TestRequest::post()
            .uri("/expenses/exp2/settle")
            .insert_header((MEMBER_HEADER, "John"))
            .set_json(SettleJson {
                member: Some("Luis".into()),
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri("/expenses/exp2/settle")
            .insert_header((MEMBER_HEADER, "John"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::get()
            .uri("/expenses/exp2/split")
            .insert_header((MEMBER_HEADER, "John"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["obligation"]["type"], "settled");
    }

    #[actix_web::test]
    async fn invalid_amount_is_400() {
        let app = test::init_service(
            App::new()
                .app_data(demo_service().await)
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/categories/1/expenses")
            .set_json(ExpenseForm {
                description: "Coffee".into(),
                amount: "free".into(),
                payer: None,
                date: "2025-05-07".into(),
                note: None,
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn budget_top_up_and_history_filter() {
        let app = test::init_service(
            App::new()
                .app_data(demo_service().await)
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/categories/2/budget/adjust")
            .set_json(BudgetJson {
                amount: "500".into(),
            })
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["budget"], "1500");
        assert_eq!(body["remaining_balance"], "1500");

        let req = test::TestRequest::get()
            .uri("/history?filter=youOwe")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["expense"]["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["exp2", "exp3", "exp4"]);
    }
}
