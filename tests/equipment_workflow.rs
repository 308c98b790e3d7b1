mod support;

use std::sync::Arc;
use mes_client::resource::catalog::equipment::{EquipmentPatch, EquipmentRequest};
use mes_client::resource::catalog::Equipment;
use mes_client::resource::domain::FilterUpdate;
use mes_client::resource::logic::ResourceListController;
use mes_client::transport::domain::ApiError;
use support::{FakeServer, RecordingObserver};


fn controller(server: &Arc<FakeServer>, page_size: u32) -> ResourceListController<Equipment> {
    ResourceListController::new(server.clone(), Arc::new(RecordingObserver::default()), page_size)
}


fn draft(code: &str) -> EquipmentRequest {
    EquipmentRequest {
        code: code.into(),
        name: "Fresadora".into(),
        kind: "production".into(),
        status: "running".into(),
        ..Default::default()
    }
}


#[tokio::test]
async fn delete_then_refetch_shows_server_totals() {
    let server = Arc::new(FakeServer::new());
    server.seed_equipment(8, "running");
    server.seed_equipment(3, "stopped");
    let list = controller(&server, 10);

    list.set_filters(FilterUpdate::new().set("status", "running")).await.unwrap();
    list.set_page(1, None).await;
    list.fetch().await.unwrap();
    assert_eq!(list.items().await.len(), 8);
    assert_eq!(list.total().await, 8);

    let target = list.items().await[3].id;
    list.delete(target).await.unwrap();
    assert_eq!(list.items().await.len(), 8);

    list.fetch().await.unwrap();
    assert_eq!(list.total().await, 7);
    assert!(list.items().await.iter().all(|e| e.id != target));
}


#[tokio::test]
async fn create_is_visible_only_after_refetch() {
    let server = Arc::new(FakeServer::new());
    server.seed_equipment(2, "running");
    let list = controller(&server, 10);
    list.fetch().await.unwrap();

    let created = list.create(&draft("EQ-900")).await.unwrap();
    assert_eq!(created.code, "EQ-900");
    assert_eq!(list.items().await.len(), 2);

    list.fetch().await.unwrap();
    assert_eq!(list.items().await.len(), 3);
    assert_eq!(list.total().await, 3);
}


#[tokio::test]
async fn update_sends_only_the_changed_fields() {
    let server = Arc::new(FakeServer::new());
    server.seed_equipment(1, "running");
    let list = controller(&server, 10);

    let patch = EquipmentPatch { status: Some("maintenance".into()), ..Default::default() };
    let updated = list.update(1, &patch).await.unwrap();
    assert_eq!(updated.status, "maintenance");
    assert_eq!(updated.code, "EQ-001");

    let sent = server.requests().pop().unwrap();
    assert_eq!(sent.body, Some(serde_json::json!({"status": "maintenance"})));
}


#[tokio::test]
async fn deleting_a_missing_record_is_not_found() {
    let server = Arc::new(FakeServer::new());
    let list = controller(&server, 10);
    assert!(matches!(list.delete(42).await, Err(ApiError::NotFound(_))));
    assert!(matches!(list.get(42).await, Err(ApiError::NotFound(_))));
}


#[tokio::test]
async fn emptied_last_page_rewinds_before_refetch() {
    let server = Arc::new(FakeServer::new());
    server.seed_equipment(11, "running");
    let list = controller(&server, 5);

    list.set_page(3, None).await;
    list.fetch().await.unwrap();
    let only = list.items().await;
    assert_eq!(only.len(), 1);

    let ack = list.delete(only[0].id).await.unwrap();
    assert!(ack.page_rewound);
    assert_eq!(list.cursor().await.page(), 2);

    list.fetch().await.unwrap();
    assert_eq!(list.items().await.len(), 5);
    assert_eq!(list.total().await, 10);
}


#[tokio::test]
async fn page_parameters_are_clamped() {
    let server = Arc::new(FakeServer::new());
    server.seed_equipment(30, "running");
    let list = controller(&server, 10);

    list.set_page(0, None).await;
    assert_eq!(list.cursor().await.page(), 1);

    list.set_page(3, None).await;
    list.set_page(3, Some(500)).await;
    let cursor = list.cursor().await;
    assert_eq!(cursor.page(), 1);
    assert_eq!(cursor.page_size(), 100);

    list.fetch().await.unwrap();
    assert_eq!(list.items().await.len(), 30);
    let query = &server.requests()[0].query;
    assert!(query.contains(&("page_size".to_string(), "100".to_string())));
}


#[tokio::test]
async fn submit_creates_then_updates() {
    let server = Arc::new(FakeServer::new());
    let list = controller(&server, 10);

    let created = list.submit(draft("EQ-500")).await.unwrap();
    list.begin_edit(Some(created.clone())).await;

    let renamed = list.submit(EquipmentRequest { name: "Fresadora 5 ejes".into(), ..draft("EQ-500") }).await.unwrap();
    assert_eq!(renamed.id, created.id);
    assert_eq!(renamed.name, "Fresadora 5 ejes");
    assert!(list.editing().await.is_none());
    assert_eq!(server.equipment_count(), 1);
}


#[tokio::test]
async fn clearing_filters_widens_the_listing() {
    let server = Arc::new(FakeServer::new());
    server.seed_equipment(4, "running");
    server.seed_equipment(2, "fault");
    let list = controller(&server, 10);

    list.set_filters(FilterUpdate::new().set("status", "fault")).await.unwrap();
    list.fetch().await.unwrap();
    assert_eq!(list.total().await, 2);

    list.clear_filters().await;
    assert!(list.filters().await.is_empty());
    list.fetch().await.unwrap();
    assert_eq!(list.total().await, 6);
}
