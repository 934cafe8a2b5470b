use std::sync::Arc;

use delivery_engine::config::Config;
use delivery_engine::error::AppError;
use delivery_engine::geo::haversine_km;
use delivery_engine::geo::route::approximate_route;
use delivery_engine::models::catalog::{
    Item, ItemCategory, Merchant, MerchantCategory, NewItem, NewMerchant,
};
use delivery_engine::models::estimate::{OrderDraft, OrderLine, SubOrder};
use delivery_engine::models::location::GeoPoint;
use delivery_engine::models::order::OrderQuery;
use delivery_engine::models::search::{MerchantFilters, SearchQuery};
use delivery_engine::observability::logging::init_tracing;
use delivery_engine::state::AppState;
use delivery_engine::store::memory::MemoryStore;
use rust_decimal::Decimal;
use uuid::Uuid;

fn setup() -> (AppState, Arc<MemoryStore>) {
    setup_with(Config::default())
}

fn setup_with(config: Config) -> (AppState, Arc<MemoryStore>) {
    // Tests share one process; only the first call installs the subscriber.
    init_tracing(&Config {
        log_level: "debug".to_string(),
        ..Config::default()
    })
    .ok();
    AppState::in_memory(config)
}

fn merchant(
    store: &MemoryStore,
    name: &str,
    category: MerchantCategory,
    lat: f64,
    lng: f64,
) -> Merchant {
    store
        .add_merchant(NewMerchant {
            name: name.to_string(),
            category,
            image_url: format!("https://img.example/{}.png", name.replace(' ', "-")),
            location: GeoPoint::new(lat, lng),
        })
        .unwrap()
}

fn item(store: &MemoryStore, merchant_id: Uuid, name: &str, cents: i64) -> Item {
    store
        .add_item(
            merchant_id,
            NewItem {
                name: name.to_string(),
                category: ItemCategory::Food,
                price: Decimal::new(cents, 2),
                image_url: "https://img.example/item.png".to_string(),
            },
        )
        .unwrap()
}

fn line(item: &Item, quantity: u32) -> OrderLine {
    OrderLine {
        item_id: item.id,
        quantity,
    }
}

fn draft(user: GeoPoint, orders: Vec<SubOrder>) -> OrderDraft {
    OrderDraft {
        user_location: user,
        orders,
    }
}

fn sub_order(merchant: &Merchant, starting: bool, items: Vec<OrderLine>) -> SubOrder {
    SubOrder {
        merchant_id: merchant.id,
        is_starting_point: starting,
        items,
    }
}

#[tokio::test]
async fn search_pages_over_filtered_merchants() {
    let (app, store) = setup();
    let a = merchant(&store, "Bakso Pak Kumis", MerchantCategory::SmallRestaurant, 0.0, 0.02);
    let b = merchant(&store, "Mie Ayam Jaya", MerchantCategory::SmallRestaurant, 0.0, 0.01);
    let c = merchant(&store, "Soto Betawi", MerchantCategory::SmallRestaurant, 0.0, -0.03);
    merchant(&store, "Indomaret", MerchantCategory::ConvenienceStore, 0.0, 0.005);
    item(&store, a.id, "Bakso Urat", 1800);
    item(&store, b.id, "Mie Ayam Bakso", 2000);
    item(&store, c.id, "Soto Daging", 2500);

    let filters = MerchantFilters {
        category: Some(MerchantCategory::SmallRestaurant),
        ..MerchantFilters::default()
    };
    let user = GeoPoint::new(0.0, 0.0);

    let page = app
        .search
        .search(
            &user,
            &SearchQuery {
                filters: filters.clone(),
                limit: Some(5),
                offset: Some(0),
            },
        )
        .await
        .unwrap();

    assert_eq!(page.meta.total, 3);
    assert_eq!(page.meta.limit, 5);
    assert_eq!(page.meta.offset, 0);
    let ids: Vec<Uuid> = page.data.iter().map(|m| m.merchant.merchant_id).collect();
    // Greedy route: b (1.1 km), then a (1.1 km further), then c across the origin.
    assert_eq!(ids, vec![b.id, a.id, c.id]);
    assert!(page.data.iter().all(|m| m.items.len() == 1));

    let empty = app
        .search
        .search(
            &user,
            &SearchQuery {
                filters,
                limit: Some(5),
                offset: Some(10),
            },
        )
        .await
        .unwrap();

    assert!(empty.data.is_empty());
    assert_eq!(empty.meta.total, 3);
    assert_eq!(empty.meta.offset, 10);
}

#[tokio::test]
async fn search_name_filter_matches_items_case_insensitively() {
    let (app, store) = setup();
    let bakso = merchant(&store, "Bakso Pak Kumis", MerchantCategory::SmallRestaurant, 0.0, 0.02);
    let mie = merchant(&store, "Mie Ayam Jaya", MerchantCategory::SmallRestaurant, 0.0, 0.01);
    merchant(&store, "Soto Betawi", MerchantCategory::SmallRestaurant, 0.0, -0.03);
    item(&store, mie.id, "Mie Ayam BAKSO", 2000);

    let page = app
        .search
        .search(
            &GeoPoint::new(0.0, 0.0),
            &SearchQuery {
                filters: MerchantFilters {
                    name: Some("bakso".to_string()),
                    ..MerchantFilters::default()
                },
                ..SearchQuery::default()
            },
        )
        .await
        .unwrap();

    let ids: Vec<Uuid> = page.data.iter().map(|m| m.merchant.merchant_id).collect();
    assert_eq!(page.meta.total, 2);
    assert_eq!(ids, vec![mie.id, bakso.id]);
}

#[tokio::test]
async fn estimate_prices_every_line() {
    let (app, store) = setup();
    let m1 = merchant(&store, "Warung Nasi", MerchantCategory::SmallRestaurant, 0.0, 0.01);
    let i1 = item(&store, m1.id, "Nasi Goreng", 1000);
    let i2 = item(&store, m1.id, "Es Teh Manis", 500);

    let estimate = app
        .estimation
        .estimate(
            &draft(
                GeoPoint::new(0.0, 0.0),
                vec![sub_order(&m1, true, vec![line(&i1, 2), line(&i2, 1)])],
            ),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    assert_eq!(estimate.total_price, Decimal::new(2500, 2));
    assert_eq!(store.estimate_count().await, 1);
}

#[tokio::test]
async fn single_merchant_time_uses_direct_distance() {
    let (app, store) = setup_with(Config {
        max_starting_point_km: 20.0,
        ..Config::default()
    });
    let m1 = merchant(&store, "Far Kitchen", MerchantCategory::LargeRestaurant, 0.0899, 0.0);
    let i1 = item(&store, m1.id, "Rendang", 3000);

    let estimate = app
        .estimation
        .estimate(
            &draft(
                GeoPoint::new(0.0, 0.0),
                vec![sub_order(&m1, true, vec![line(&i1, 1)])],
            ),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    assert!((estimate.estimated_delivery_minutes - 15.0).abs() < 0.05);
}

#[tokio::test]
async fn multi_merchant_time_follows_greedy_route() {
    let (app, store) = setup();
    let user = GeoPoint::new(0.0, 0.0);
    let near = merchant(&store, "Kopi Tuku", MerchantCategory::BoothKiosk, 0.0, 0.01);
    let far = merchant(&store, "Martabak Bangka", MerchantCategory::BoothKiosk, 0.05, 0.05);
    let coffee = item(&store, near.id, "Kopi Susu", 1800);
    let martabak = item(&store, far.id, "Martabak Manis", 4500);

    let estimate = app
        .estimation
        .estimate(
            &draft(
                user,
                vec![
                    sub_order(&far, false, vec![line(&martabak, 1)]),
                    sub_order(&near, true, vec![line(&coffee, 2)]),
                ],
            ),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    let route = approximate_route(&user, &[far.location, near.location]);
    let expected = route.total_distance_km / 40.0 * 60.0;
    assert!((estimate.estimated_delivery_minutes - expected).abs() < 1e-9);
    assert_eq!(estimate.total_price, Decimal::new(8100, 2));
}

#[tokio::test]
async fn distant_starting_point_is_rejected_without_persisting() {
    let (app, store) = setup();
    let user = GeoPoint::new(0.0, 0.0);
    let far = merchant(&store, "Remote Diner", MerchantCategory::MediumRestaurant, 0.05, 0.0);
    let dish = item(&store, far.id, "Gado Gado", 2000);
    assert!(haversine_km(&user, &far.location) > 3.0);

    let err = app
        .estimation
        .estimate(
            &draft(user, vec![sub_order(&far, true, vec![line(&dish, 1)])]),
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ConstraintViolation(_)));
    assert_eq!(store.estimate_count().await, 0);
}

#[tokio::test]
async fn unknown_merchant_is_rejected_without_persisting() {
    let (app, store) = setup();
    let real = merchant(&store, "Warung Nasi", MerchantCategory::SmallRestaurant, 0.0, 0.01);
    let dish = item(&store, real.id, "Nasi Uduk", 1200);

    let err = app
        .estimation
        .estimate(
            &draft(
                GeoPoint::new(0.0, 0.0),
                vec![
                    sub_order(&real, true, vec![line(&dish, 1)]),
                    SubOrder {
                        merchant_id: Uuid::new_v4(),
                        is_starting_point: false,
                        items: vec![line(&dish, 1)],
                    },
                ],
            ),
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(store.estimate_count().await, 0);
}

#[tokio::test]
async fn item_from_other_merchant_is_invalid() {
    let (app, store) = setup();
    let m1 = merchant(&store, "Warung Nasi", MerchantCategory::SmallRestaurant, 0.0, 0.01);
    let m2 = merchant(&store, "Warung Kopi", MerchantCategory::BoothKiosk, 0.0, 0.02);
    let coffee = item(&store, m2.id, "Kopi Hitam", 800);

    let err = app
        .estimation
        .estimate(
            &draft(
                GeoPoint::new(0.0, 0.0),
                vec![sub_order(&m1, true, vec![line(&coffee, 1)])],
            ),
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidInput(_)));
    assert_eq!(store.estimate_count().await, 0);
}

#[tokio::test]
async fn finalize_creates_one_order_and_history_groups_it() {
    let (app, store) = setup();
    let user_id = Uuid::new_v4();
    let m1 = merchant(&store, "Warung Nasi", MerchantCategory::SmallRestaurant, 0.0, 0.01);
    let m2 = merchant(&store, "Warung Kopi", MerchantCategory::BoothKiosk, 0.0, 0.02);
    let rice = item(&store, m1.id, "Nasi Goreng", 1000);
    let tea = item(&store, m1.id, "Es Teh Manis", 500);
    let coffee = item(&store, m2.id, "Kopi Hitam", 800);

    let estimate = app
        .estimation
        .estimate(
            &draft(
                GeoPoint::new(0.0, 0.0),
                vec![
                    sub_order(&m1, true, vec![line(&rice, 2), line(&tea, 1)]),
                    sub_order(&m2, false, vec![line(&coffee, 3)]),
                ],
            ),
            user_id,
        )
        .await
        .unwrap();

    let order_id = app
        .finalization
        .finalize(estimate.id, user_id)
        .await
        .unwrap();

    assert_eq!(store.order_count().await, 1);
    assert_eq!(store.order_item_count().await, 3);

    let history = app
        .history
        .list_orders(user_id, &OrderQuery::default())
        .await
        .unwrap();

    assert_eq!(history.len(), 1);
    let view = &history[0];
    assert_eq!(view.order_id, order_id);
    assert_eq!(view.total_price, Decimal::new(4900, 2));
    assert_eq!(view.orders.len(), 2);

    let first = &view.orders[0];
    assert_eq!(first.merchant.merchant_id, m1.id);
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.items[0].item_id, rice.id);
    assert_eq!(first.items[0].quantity, 2);

    let second = &view.orders[1];
    assert_eq!(second.merchant.merchant_id, m2.id);
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].quantity, 3);

    let other_user = app
        .history
        .list_orders(Uuid::new_v4(), &OrderQuery::default())
        .await
        .unwrap();
    assert!(other_user.is_empty());
}

#[tokio::test]
async fn estimate_cannot_be_finalized_twice() {
    let (app, store) = setup();
    let user_id = Uuid::new_v4();
    let m1 = merchant(&store, "Warung Nasi", MerchantCategory::SmallRestaurant, 0.0, 0.01);
    let rice = item(&store, m1.id, "Nasi Goreng", 1000);

    let estimate = app
        .estimation
        .estimate(
            &draft(
                GeoPoint::new(0.0, 0.0),
                vec![sub_order(&m1, true, vec![line(&rice, 1)])],
            ),
            user_id,
        )
        .await
        .unwrap();

    app.finalization
        .finalize(estimate.id, user_id)
        .await
        .unwrap();
    let err = app
        .finalization
        .finalize(estimate.id, user_id)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ConstraintViolation(_)));
    assert_eq!(store.order_count().await, 1);
    assert_eq!(store.order_item_count().await, 1);
}

#[tokio::test]
async fn finalize_rejects_unknown_or_foreign_estimates() {
    let (app, store) = setup();
    let owner = Uuid::new_v4();
    let m1 = merchant(&store, "Warung Nasi", MerchantCategory::SmallRestaurant, 0.0, 0.01);
    let rice = item(&store, m1.id, "Nasi Goreng", 1000);

    let estimate = app
        .estimation
        .estimate(
            &draft(
                GeoPoint::new(0.0, 0.0),
                vec![sub_order(&m1, true, vec![line(&rice, 1)])],
            ),
            owner,
        )
        .await
        .unwrap();

    let err = app
        .finalization
        .finalize(Uuid::new_v4(), owner)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = app
        .finalization
        .finalize(estimate.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    assert_eq!(store.order_count().await, 0);
}

#[tokio::test]
async fn finalize_charges_current_prices() {
    let (app, store) = setup();
    let user_id = Uuid::new_v4();
    let m1 = merchant(&store, "Warung Nasi", MerchantCategory::SmallRestaurant, 0.0, 0.01);
    let rice = item(&store, m1.id, "Nasi Goreng", 1000);

    let estimate = app
        .estimation
        .estimate(
            &draft(
                GeoPoint::new(0.0, 0.0),
                vec![sub_order(&m1, true, vec![line(&rice, 2)])],
            ),
            user_id,
        )
        .await
        .unwrap();
    assert_eq!(estimate.total_price, Decimal::new(2000, 2));

    store.set_item_price(rice.id, Decimal::new(1200, 2)).unwrap();
    app.finalization
        .finalize(estimate.id, user_id)
        .await
        .unwrap();

    let history = app
        .history
        .list_orders(user_id, &OrderQuery::default())
        .await
        .unwrap();
    assert_eq!(history[0].total_price, Decimal::new(2400, 2));
}

#[tokio::test]
async fn history_filters_and_pages_orders() {
    let (app, store) = setup();
    let user_id = Uuid::new_v4();
    let restaurant = merchant(&store, "Warung Nasi", MerchantCategory::SmallRestaurant, 0.0, 0.01);
    let kiosk = merchant(&store, "Warung Kopi", MerchantCategory::BoothKiosk, 0.0, 0.02);
    let rice = item(&store, restaurant.id, "Nasi Goreng", 1000);
    let coffee = item(&store, kiosk.id, "Kopi Hitam", 800);

    let mut placed = Vec::new();
    for (target, dish) in [(&restaurant, &rice), (&kiosk, &coffee), (&restaurant, &rice)] {
        let estimate = app
            .estimation
            .estimate(
                &draft(
                    GeoPoint::new(0.0, 0.0),
                    vec![sub_order(target, true, vec![line(dish, 1)])],
                ),
                user_id,
            )
            .await
            .unwrap();
        placed.push(
            app.finalization
                .finalize(estimate.id, user_id)
                .await
                .unwrap(),
        );
    }

    let kiosk_orders = app
        .history
        .list_orders(
            user_id,
            &OrderQuery {
                filters: MerchantFilters {
                    category: Some(MerchantCategory::BoothKiosk),
                    ..MerchantFilters::default()
                },
                ..OrderQuery::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(kiosk_orders.len(), 1);
    assert_eq!(kiosk_orders[0].order_id, placed[1]);

    let by_item_name = app
        .history
        .list_orders(
            user_id,
            &OrderQuery {
                filters: MerchantFilters {
                    name: Some("GORENG".to_string()),
                    ..MerchantFilters::default()
                },
                ..OrderQuery::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(by_item_name.len(), 2);

    let newest = app
        .history
        .list_orders(
            user_id,
            &OrderQuery {
                limit: Some(1),
                ..OrderQuery::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(newest.len(), 1);
    assert_eq!(newest[0].order_id, placed[2]);
}

#[tokio::test]
async fn overflowing_price_is_rejected_without_persisting() {
    let (app, store) = setup();
    let m1 = merchant(&store, "Gold Leaf Bistro", MerchantCategory::LargeRestaurant, 0.0, 0.01);
    let priceless = store
        .add_item(
            m1.id,
            NewItem {
                name: "Gold Leaf Steak".to_string(),
                category: ItemCategory::Food,
                price: Decimal::MAX,
                image_url: "https://img.example/steak.png".to_string(),
            },
        )
        .unwrap();

    let err = app
        .estimation
        .estimate(
            &draft(
                GeoPoint::new(0.0, 0.0),
                vec![sub_order(&m1, true, vec![line(&priceless, 2)])],
            ),
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidInput(_)));
    assert_eq!(store.estimate_count().await, 0);
}

#[tokio::test]
async fn metrics_track_outcomes() {
    let (app, store) = setup();
    let far = merchant(&store, "Remote Diner", MerchantCategory::MediumRestaurant, 0.05, 0.0);
    let dish = item(&store, far.id, "Gado Gado", 2000);

    let _ = app
        .estimation
        .estimate(
            &draft(
                GeoPoint::new(0.0, 0.0),
                vec![sub_order(&far, true, vec![line(&dish, 1)])],
            ),
            Uuid::new_v4(),
        )
        .await;

    let body = app.metrics.encode().unwrap();
    assert!(body.contains("estimates_total"));
    assert!(body.contains("constraint_violation"));
}
