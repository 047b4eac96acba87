use pocketmill_core::spatial_index::{Bounds, SpatialIndex};

#[test]
fn test_bounds_creation() {
    let bounds = Bounds::new(0.0, 0.0, 10.0, 10.0);
    assert_eq!(bounds.min_x, 0.0);
    assert_eq!(bounds.max_x, 10.0);
    assert_eq!(bounds.width(), 10.0);
    assert_eq!(bounds.height(), 10.0);
}

#[test]
fn test_bounds_center() {
    let bounds = Bounds::new(0.0, 0.0, 10.0, 10.0);
    let (cx, cy) = bounds.center();
    assert_eq!(cx, 5.0);
    assert_eq!(cy, 5.0);
}

#[test]
fn test_bounds_contains_point() {
    let bounds = Bounds::new(0.0, 0.0, 10.0, 10.0);
    assert!(bounds.contains_point(5.0, 5.0));
    assert!(bounds.contains_point(0.0, 0.0));
    assert!(bounds.contains_point(10.0, 10.0));
    assert!(!bounds.contains_point(11.0, 5.0));
    assert!(!bounds.contains_point(5.0, -1.0));
}

#[test]
fn test_bounds_intersection() {
    let b1 = Bounds::new(0.0, 0.0, 10.0, 10.0);
    let b2 = Bounds::new(5.0, 5.0, 15.0, 15.0);
    let b3 = Bounds::new(20.0, 20.0, 30.0, 30.0);

    assert!(b1.intersects(&b2));
    assert!(b2.intersects(&b1));
    assert!(!b1.intersects(&b3));
}

#[test]
fn test_spatial_index_creation() {
    let index = SpatialIndex::new(Bounds::new(-100.0, -100.0, 100.0, 100.0), 8, 16);
    let stats = index.stats();
    assert_eq!(stats.total_items, 0);
}

#[test]
fn test_spatial_index_insert_and_query() {
    let mut index = SpatialIndex::new(Bounds::new(-100.0, -100.0, 100.0, 100.0), 8, 16);

    let bounds1 = Bounds::new(0.0, 0.0, 10.0, 10.0);
    let bounds2 = Bounds::new(5.0, 5.0, 15.0, 15.0);

    index.insert(0, &bounds1);
    index.insert(1, &bounds2);

    let results = index.query(&Bounds::new(7.0, 7.0, 12.0, 12.0));
    assert!(results.contains(&0));
    assert!(results.contains(&1));

    let off = index.query(&Bounds::new(50.0, 50.0, 60.0, 60.0));
    assert!(off.is_empty());
}

#[test]
fn test_spatial_index_query_point() {
    let mut index = SpatialIndex::new(Bounds::new(-100.0, -100.0, 100.0, 100.0), 8, 16);

    let bounds = Bounds::new(0.0, 0.0, 10.0, 10.0);
    index.insert(0, &bounds);

    let results = index.query_point(5.0, 5.0);
    assert!(results.contains(&0));

    let results2 = index.query_point(150.0, 150.0);
    assert!(!results2.contains(&0));
}

#[test]
fn test_spatial_index_split_keeps_items_reachable() {
    let mut index = SpatialIndex::new(Bounds::new(0.0, 0.0, 100.0, 100.0), 4, 8);

    for i in 0..100 {
        let x = (i % 10) as f64 * 10.0;
        let y = (i / 10) as f64 * 10.0;
        index.insert(i, &Bounds::new(x, y, x + 1.0, y + 1.0));
    }

    assert_eq!(index.stats().total_items, 100);
    for i in 0..100 {
        let x = (i % 10) as f64 * 10.0 + 0.5;
        let y = (i / 10) as f64 * 10.0 + 0.5;
        assert!(index.query_point(x, y).contains(&i), "item {} lost", i);
    }
}

#[test]
fn test_spatial_index_clear() {
    let mut index = SpatialIndex::new(Bounds::new(-100.0, -100.0, 100.0, 100.0), 8, 16);

    let bounds = Bounds::new(0.0, 0.0, 10.0, 10.0);
    index.insert(0, &bounds);
    assert!(!index.query_point(5.0, 5.0).is_empty());

    index.clear();
    assert!(index.query_point(5.0, 5.0).is_empty());
}

#[test]
fn test_spatial_index_item_outside_root_bounds() {
    let mut index = SpatialIndex::new(Bounds::new(0.0, 0.0, 10.0, 10.0), 8, 16);

    index.insert(7, &Bounds::new(20.0, 20.0, 25.0, 25.0));
    let results = index.query(&Bounds::new(19.0, 19.0, 26.0, 26.0));
    assert!(results.contains(&7));
}
