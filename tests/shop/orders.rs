use metal_factory::{CartItem, OrderId, OrderStatus, Role, ShopError};

use crate::support::World;

fn placed_order(world: &World, customer: &metal_factory::Principal) -> OrderId {
    let p = world.product("Coil", 700, 50);
    world
        .shop
        .checkout(customer, Some(vec![CartItem::new(p, 1)]))
        .unwrap()
        .id
}

#[test]
fn other_customers_order_is_forbidden() {
    let world = World::new();
    let owner = world.user("nia", Role::Customer);
    let other = world.user("oli", Role::Customer);
    let id = placed_order(&world, &owner);

    assert!(world.shop.customer_order(&owner, &id).is_ok());
    assert!(matches!(
        world.shop.customer_order(&other, &id),
        Err(ShopError::Forbidden(_))
    ));
    assert!(matches!(
        world.shop.customer_order(&owner, &OrderId::from("missing")),
        Err(ShopError::NotFound { .. })
    ));
}

#[test]
fn status_follows_the_lifecycle() {
    let world = World::new();
    let nia = world.user("nia", Role::Customer);
    let sup = world.user("sup", Role::Supervisor);
    let id = placed_order(&world, &nia);

    for next in [OrderStatus::Processing, OrderStatus::Shipped, OrderStatus::Delivered] {
        let view = world.shop.update_order_status(&sup, &id, next).unwrap();
        assert_eq!(view.status, next);
    }

    let err = world
        .shop
        .update_order_status(world.admin(), &id, OrderStatus::Processing)
        .unwrap_err();
    assert_eq!(
        err,
        ShopError::InvalidTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Processing
        }
    );
    assert_eq!(err.status_code(), 400);
}

#[test]
fn cancel_is_terminal() {
    let world = World::new();
    let nia = world.user("nia", Role::Customer);
    let id = placed_order(&world, &nia);

    world
        .shop
        .update_order_status(world.admin(), &id, OrderStatus::Cancelled)
        .unwrap();
    assert!(matches!(
        world.shop.update_order_status(world.admin(), &id, OrderStatus::Pending),
        Err(ShopError::InvalidTransition { .. })
    ));
}

#[test]
fn only_admins_and_supervisors_change_status() {
    let world = World::new();
    let nia = world.user("nia", Role::Customer);
    let seller = world.user("sal", Role::Seller);
    let id = placed_order(&world, &nia);

    for actor in [&nia, &seller] {
        assert!(matches!(
            world.shop.update_order_status(actor, &id, OrderStatus::Processing),
            Err(ShopError::Forbidden(_))
        ));
    }
    assert!(matches!(
        world
            .shop
            .update_order_status(world.admin(), &OrderId::from("missing"), OrderStatus::Processing),
        Err(ShopError::NotFound { .. })
    ));
}

#[test]
fn listings_are_scoped_and_newest_first() {
    let world = World::new();
    let nia = world.user("nia", Role::Customer);
    let oli = world.user("oli", Role::Customer);
    let first = placed_order(&world, &nia);
    std::thread::sleep(std::time::Duration::from_millis(5));
    let second = placed_order(&world, &nia);
    placed_order(&world, &oli);

    let mine = world.shop.customer_orders(&nia).unwrap();
    assert_eq!(
        mine.iter().map(|o| o.id.clone()).collect::<Vec<_>>(),
        vec![second, first]
    );

    assert_eq!(world.shop.all_orders(world.admin()).unwrap().len(), 3);
    assert!(matches!(world.shop.all_orders(&nia), Err(ShopError::Forbidden(_))));
}
