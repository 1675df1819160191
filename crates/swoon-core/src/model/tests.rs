use crate::model::*;
use chrono::{Duration, Utc};
use uuid::Uuid;

#[test]
fn test_session_creation() {
    let shop = Uuid::new_v4();
    let session = Session::new(shop, "stylist".to_string(), Some("Ada".to_string()));

    assert_eq!(session.shop_id, shop);
    assert_eq!(session.created_by, "stylist");
    assert_eq!(session.bride_name.as_deref(), Some("Ada"));
    assert_eq!(session.state, SessionState::Active);
    assert!(!session.is_completed());
    assert!(session.completed_at().is_none());
}

#[test]
fn test_session_tokens_are_random() {
    let shop = Uuid::new_v4();
    let a = Session::new(shop, "op".to_string(), None);
    let b = Session::new(shop, "op".to_string(), None);
    assert_ne!(a.token, b.token);
    assert_eq!(a.token.get_version_num(), 4);
}

#[test]
fn test_complete_sets_timestamp_once() {
    let session = Session::new(Uuid::new_v4(), "op".to_string(), None);
    let first = Utc::now();
    let later = first + Duration::minutes(5);

    let session = session.complete(first);
    assert_eq!(session.completed_at(), Some(first));

    let session = session.complete(later);
    assert_eq!(session.completed_at(), Some(first));
}

#[test]
fn test_session_serde_flattens_state() {
    let at = Utc::now();
    let session = Session::new(Uuid::new_v4(), "op".to_string(), None).complete(at);
    let json = serde_json::to_value(&session).unwrap();

    assert_eq!(json["status"], "completed");
    assert!(json.get("completed_at").is_some());
    assert!(json.get("id").is_none());

    let parsed: Session = serde_json::from_value(json).unwrap();
    assert_eq!(parsed.completed_at(), Some(at));
}

#[test]
fn test_active_session_serde() {
    let session = Session::new(Uuid::new_v4(), "op".to_string(), Some("Bea".to_string()));
    let json = serde_json::to_value(&session).unwrap();
    assert_eq!(json["status"], "active");
    assert!(json.get("completed_at").is_none());
}

#[test]
fn test_state_display() {
    assert_eq!(SessionState::Active.to_string(), "active");
    assert_eq!(
        SessionState::Completed { at: Utc::now() }.to_string(),
        "completed"
    );
}

#[test]
fn test_validate_bride_name() {
    assert_eq!(validate_bride_name(None).unwrap(), None);
    assert_eq!(validate_bride_name(Some("   ")).unwrap(), None);
    assert_eq!(
        validate_bride_name(Some("  Chloe ")).unwrap().as_deref(),
        Some("Chloe")
    );
    let long = "x".repeat(MAX_NAME_LENGTH + 1);
    assert!(validate_bride_name(Some(&long)).is_err());
}

#[test]
fn test_validate_operator() {
    assert!(validate_operator("stylist").is_ok());
    assert!(validate_operator("  ").is_err());
}

#[test]
fn test_validate_new_dress() {
    let shop = Uuid::new_v4();
    assert!(validate_new_dress(&NewDress::new(shop, "Luna 1", 1200.0)).is_ok());
    assert!(validate_new_dress(&NewDress::new(shop, "", 1200.0)).is_err());
    assert!(validate_new_dress(&NewDress::new(shop, "Luna", -1.0)).is_err());
    assert!(validate_new_dress(&NewDress::new(shop, "Luna", f64::NAN)).is_err());
    assert!(validate_new_dress(&NewDress::new(shop, "x".repeat(300), 10.0)).is_err());
}

#[test]
fn test_validate_shop_name() {
    assert!(validate_shop_name("Luna Bridal Atelier").is_ok());
    assert!(validate_shop_name(" ").is_err());
}

#[test]
fn test_new_dress_builder() {
    let shop = Uuid::new_v4();
    let dress = NewDress::new(shop, " Aurora ", 2100.0)
        .with_brand("Celeste")
        .with_color("Ivory")
        .with_silhouette("A-Line")
        .with_neckline("V-neck")
        .with_fabric("Lace")
        .with_stock(3)
        .with_size_range("0-18")
        .with_style_tags("romantic, modern")
        .into_dress(7, Utc::now());

    assert_eq!(dress.id, 7);
    assert_eq!(dress.name, "Aurora");
    assert_eq!(dress.brand, "Celeste");
    assert_eq!(dress.silhouette, "A-Line");
    assert_eq!(dress.shop_id, shop);
    assert_eq!(dress.stock, 3);
    assert_eq!(dress.size_range, "0-18");
    assert_eq!(dress.style_tags, "romantic, modern");
}

#[test]
fn test_dress_json_without_extra_attributes_uses_defaults() {
    let json = serde_json::json!({
        "id": 1,
        "shop_id": Uuid::new_v4(),
        "name": "Luna 1",
        "price": 1200.0,
        "created_at": Utc::now(),
    });
    let dress: Dress = serde_json::from_value(json).unwrap();
    assert_eq!(dress.stock, 0);
    assert!(dress.size_range.is_empty());
    assert!(dress.style_tags.is_empty());
}

#[test]
fn test_price_range_inclusive() {
    let range = PriceRange::new(Some(1000.0), Some(1500.0));
    assert!(range.contains(1000.0));
    assert!(range.contains(1500.0));
    assert!(!range.contains(999.99));
    assert!(!range.contains(1500.01));
}

#[test]
fn test_price_range_independent_bounds() {
    let min_only = PriceRange::new(Some(1200.0), None);
    assert!(!min_only.contains(1000.0));
    assert!(min_only.contains(9000.0));

    let max_only = PriceRange::new(None, Some(1200.0));
    assert!(max_only.contains(0.0));
    assert!(!max_only.contains(1200.5));

    let open = PriceRange::default();
    assert!(open.is_unbounded());
    assert!(open.contains(f64::MAX));
}

#[test]
fn test_price_range_validated() {
    assert!(PriceRange::validated(None, None).is_ok());
    assert!(PriceRange::validated(Some(0.0), Some(0.0)).is_ok());
    let range = PriceRange::validated(Some(900.0), Some(1500.0)).unwrap();
    assert_eq!(range, PriceRange::new(Some(900.0), Some(1500.0)));

    for (min, max) in [
        (Some(f64::NAN), None),
        (None, Some(f64::NAN)),
        (Some(f64::INFINITY), None),
        (None, Some(f64::NEG_INFINITY)),
        (Some(-1.0), None),
        (None, Some(-0.5)),
        (Some(2000.0), Some(1000.0)),
    ] {
        let err = PriceRange::validated(min, max).unwrap_err();
        assert_eq!(err.kind(), "invalid_input", "{min:?}..{max:?}");
    }
}
