// ==========================================
// 配载台账 API 集成测试
// ==========================================
// 职责: 验证配载记录增删、余量扣减、容量预检、分批序号与计划落库
// ==========================================


#[cfg(test)]
mod ledger_api_test {
    use container_loading::domain::PackableUnit;
    use container_loading::repository::{
        ActionLogRepository, AllocationRepository, ContainerRepository,
    };
    use container_loading::{
        ActionType, AllocationAlgorithm, ApiError, ConcurrencyConflict, ContainerStatus,
        RuleViolation,
    };

    use crate::test_helpers::{ctx, get_line, seed_source_line, setup_env, TestEnv};

    /// 出运单 + 关联 PI-1 + 一个 20GP 实箱
    fn shipment_with_container(env: &TestEnv, number: &str) -> (String, String) {
        let c = ctx("clerk");
        let shipment = env.ledger.create_shipment(number, &c).unwrap();
        env.ledger
            .link_commitment(&shipment.shipment_id, "PI-1", &c)
            .unwrap();
        let container = env
            .ledger
            .create_container(&shipment.shipment_id, "20GP", &c)
            .unwrap();
        (shipment.shipment_id, container.container_id)
    }

    fn unit(id: &str, line: &str) -> PackableUnit {
        PackableUnit {
            unit_id: id.to_string(),
            length_mm: 1000.0,
            width_mm: 1000.0,
            height_mm: 1000.0,
            gross_weight_kg: 500.0,
            net_weight_kg: 480.0,
            source_line_id: line.to_string(),
            quantity: 1,
        }
    }

    // ==========================================
    // 增删往返
    // ==========================================

    #[test]
    fn test_add_then_remove_restores_remaining_exactly() {
        let env = setup_env();
        seed_source_line(&env.conn, "L1", "PI-1", 100, 20.0, 0.05);
        let (_, container_id) = shipment_with_container(&env, "SHP-RT");
        let before = get_line(&env.conn, "L1");

        let record = env
            .ledger
            .add_allocation(&container_id, "L1", 30, None, None, &ctx("clerk"))
            .unwrap();
        assert_eq!(record.total_weight_kg, 600.0);
        assert_eq!(record.customs_value, 375.0);

        let mid = get_line(&env.conn, "L1");
        assert_eq!(mid.quantity_remaining(), 70);

        env.ledger
            .remove_allocation(&record.record_id, &ctx("clerk"))
            .unwrap();

        let after = get_line(&env.conn, "L1");
        assert_eq!(after.quantity_remaining(), before.quantity_remaining());
        assert_eq!(after.quantity_shipped, 0);

        let container = ContainerRepository::new(env.conn.clone())
            .find_by_id(&container_id)
            .unwrap()
            .unwrap();
        assert_eq!(container.current_weight, 0.0);
        assert_eq!(container.current_volume, 0.0);
    }

    #[test]
    fn test_quantity_shipped_equals_sum_of_live_records() {
        let env = setup_env();
        seed_source_line(&env.conn, "L1", "PI-1", 100, 10.0, 0.01);
        let (_, container_id) = shipment_with_container(&env, "SHP-SUM");
        let c = ctx("clerk");

        let r1 = env.ledger.add_allocation(&container_id, "L1", 10, None, None, &c).unwrap();
        env.ledger.add_allocation(&container_id, "L1", 25, None, None, &c).unwrap();
        env.ledger.add_allocation(&container_id, "L1", 5, None, None, &c).unwrap();
        env.ledger.remove_allocation(&r1.record_id, &c).unwrap();

        let line = get_line(&env.conn, "L1");
        let conn = env.conn.lock().unwrap();
        let live = AllocationRepository::sum_for_line_with(&conn, "L1").unwrap();
        assert_eq!(line.quantity_shipped, live);
        assert_eq!(live, 30);
        assert!(line.quantity_remaining() >= 0);
    }

    // ==========================================
    // 拒绝路径（整体回滚）
    // ==========================================

    #[test]
    fn test_insufficient_quantity_is_rejected_without_writes() {
        let env = setup_env();
        seed_source_line(&env.conn, "L1", "PI-1", 10, 1.0, 0.01);
        let (shipment_id, container_id) = shipment_with_container(&env, "SHP-INS");

        let err = env
            .ledger
            .add_allocation(&container_id, "L1", 11, None, None, &ctx("clerk"))
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(RuleViolation::InsufficientQuantity {
                requested: 11,
                remaining: 10,
                ..
            })
        ));

        assert_eq!(get_line(&env.conn, "L1").quantity_shipped, 0);
        let logs = ActionLogRepository::new(env.conn.clone());
        assert_eq!(logs.count_by_type(&shipment_id, ActionType::AddAllocation).unwrap(), 0);
    }

    #[test]
    fn test_capacity_exceeded_is_rejected() {
        let env = setup_env();
        // 20GP 容积 28m³, 每件 1m³
        seed_source_line(&env.conn, "L1", "PI-1", 100, 100.0, 1.0);
        let (_, container_id) = shipment_with_container(&env, "SHP-CAP");

        let err = env
            .ledger
            .add_allocation(&container_id, "L1", 29, None, None, &ctx("clerk"))
            .unwrap_err();
        match err {
            ApiError::Validation(RuleViolation::CapacityExceeded { container_id: id, detail }) => {
                assert_eq!(id, container_id);
                assert!(!detail.is_empty());
            }
            other => panic!("unexpected: {other:?}"),
        }

        // 恰好装满不视为超限
        env.ledger
            .add_allocation(&container_id, "L1", 28, None, None, &ctx("clerk"))
            .unwrap();
        assert_eq!(get_line(&env.conn, "L1").quantity_remaining(), 72);
    }

    #[test]
    fn test_unlinked_commitment_is_rejected() {
        let env = setup_env();
        seed_source_line(&env.conn, "L2", "PI-2", 50, 1.0, 0.01);
        let (_, container_id) = shipment_with_container(&env, "SHP-LNK");

        let err = env
            .ledger
            .add_allocation(&container_id, "L2", 5, None, None, &ctx("clerk"))
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(RuleViolation::CommitmentNotLinked { .. })
        ));
    }

    #[test]
    fn test_non_positive_quantity_is_invalid_input() {
        let env = setup_env();
        seed_source_line(&env.conn, "L1", "PI-1", 50, 1.0, 0.01);
        let (_, container_id) = shipment_with_container(&env, "SHP-NEG");

        let err = env
            .ledger
            .add_allocation(&container_id, "L1", 0, None, None, &ctx("clerk"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(RuleViolation::InvalidInput(_))));
    }

    #[test]
    fn test_stale_revision_is_concurrency_error() {
        let env = setup_env();
        seed_source_line(&env.conn, "L1", "PI-1", 50, 1.0, 0.01);
        let (_, container_id) = shipment_with_container(&env, "SHP-REV");
        let c = ctx("clerk");

        let seen = get_line(&env.conn, "L1").revision;
        env.ledger
            .add_allocation(&container_id, "L1", 5, None, Some(seen), &c)
            .unwrap();

        let err = env
            .ledger
            .add_allocation(&container_id, "L1", 5, None, Some(seen), &c)
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Concurrency(ConcurrencyConflict::StaleLineRevision { .. })
        ));
        assert!(err.is_concurrency());
        assert_eq!(get_line(&env.conn, "L1").quantity_shipped, 5);
    }

    #[test]
    fn test_unknown_container_is_not_found() {
        let env = setup_env();
        seed_source_line(&env.conn, "L1", "PI-1", 50, 1.0, 0.01);

        let err = env
            .ledger
            .add_allocation("missing", "L1", 1, None, None, &ctx("clerk"))
            .unwrap_err();
        match err {
            ApiError::NotFound { entity, .. } => assert_eq!(entity, "Container"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    // ==========================================
    // 实箱
    // ==========================================

    #[test]
    fn test_container_numbers_do_not_collide_after_removal() {
        let env = setup_env();
        let c = ctx("clerk");
        let shipment = env.ledger.create_shipment("SHP-NUM", &c).unwrap();
        let first = env.ledger.create_container(&shipment.shipment_id, "20GP", &c).unwrap();
        let second = env.ledger.create_container(&shipment.shipment_id, "40GP", &c).unwrap();
        assert_eq!(first.container_number, "SHP-NUM-CNT001");
        assert_eq!(second.container_number, "SHP-NUM-CNT002");

        env.ledger.remove_container(&second.container_id, &c).unwrap();
        let third = env.ledger.create_container(&shipment.shipment_id, "20GP", &c).unwrap();
        assert_eq!(third.container_number, "SHP-NUM-CNT002");

        env.ledger.remove_container(&first.container_id, &c).unwrap();
        let fourth = env.ledger.create_container(&shipment.shipment_id, "20GP", &c).unwrap();
        assert_eq!(fourth.container_number, "SHP-NUM-CNT003");
    }

    #[test]
    fn test_unknown_container_type_is_not_found() {
        let env = setup_env();
        let c = ctx("clerk");
        let shipment = env.ledger.create_shipment("SHP-TYPE", &c).unwrap();
        let err = env
            .ledger
            .create_container(&shipment.shipment_id, "45HQ", &c)
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound { .. }));
    }

    #[test]
    fn test_remove_container_releases_quantity() {
        let env = setup_env();
        seed_source_line(&env.conn, "L1", "PI-1", 100, 2.0, 0.01);
        let (_, container_id) = shipment_with_container(&env, "SHP-RMC");
        let c = ctx("clerk");
        env.ledger.add_allocation(&container_id, "L1", 40, None, None, &c).unwrap();
        env.ledger.add_allocation(&container_id, "L1", 20, None, None, &c).unwrap();

        let removed = env.ledger.remove_container(&container_id, &c).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(get_line(&env.conn, "L1").quantity_shipped, 0);
        assert!(ContainerRepository::new(env.conn.clone())
            .find_by_id(&container_id)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_mark_packed_moves_container_and_records() {
        let env = setup_env();
        seed_source_line(&env.conn, "L1", "PI-1", 100, 2.0, 0.01);
        let (_, container_id) = shipment_with_container(&env, "SHP-PCK");
        let c = ctx("loader");

        let err = env.ledger.mark_packed(&container_id, &c).unwrap_err();
        assert!(matches!(err, ApiError::Validation(RuleViolation::EmptyContainer { .. })));

        env.ledger.add_allocation(&container_id, "L1", 3, None, None, &c).unwrap();
        env.ledger.add_allocation(&container_id, "L1", 4, None, None, &c).unwrap();
        assert_eq!(env.ledger.mark_packed(&container_id, &c).unwrap(), 2);

        let container = ContainerRepository::new(env.conn.clone())
            .find_by_id(&container_id)
            .unwrap()
            .unwrap();
        assert_eq!(container.status, ContainerStatus::Packed);

        // 已装箱实箱可继续追加,新记录为 DRAFT
        env.ledger.add_allocation(&container_id, "L1", 1, None, None, &c).unwrap();
        assert_eq!(env.ledger.mark_packed(&container_id, &c).unwrap(), 1);
    }

    // ==========================================
    // 分批序号
    // ==========================================

    #[test]
    fn test_shipment_sequence_is_per_line_and_monotonic() {
        let env = setup_env();
        seed_source_line(&env.conn, "L1", "PI-1", 100, 1.0, 0.01);
        let c = ctx("clerk");

        let (ship_a, cont_a) = shipment_with_container(&env, "SHP-A");
        let a1 = env.ledger.add_allocation(&cont_a, "L1", 5, None, None, &c).unwrap();
        let a2 = env.ledger.add_allocation(&cont_a, "L1", 5, None, None, &c).unwrap();
        assert_eq!(a1.shipment_sequence, 1);
        assert_eq!(a2.shipment_sequence, 1);

        let (ship_b, cont_b) = shipment_with_container(&env, "SHP-B");
        let b1 = env.ledger.add_allocation(&cont_b, "L1", 5, None, None, &c).unwrap();
        assert_eq!(b1.shipment_sequence, 2);

        // 取消不回收序号
        env.lifecycle.cancel(&ship_b, "客户改期", &c).unwrap();
        let (_, cont_c) = shipment_with_container(&env, "SHP-C");
        let c1 = env.ledger.add_allocation(&cont_c, "L1", 5, None, None, &c).unwrap();
        assert_eq!(c1.shipment_sequence, 3);

        // A 的第二个实箱沿用 A 的序号
        let cont_a2 = env.ledger.create_container(&ship_a, "40GP", &c).unwrap();
        let a3 = env
            .ledger
            .add_allocation(&cont_a2.container_id, "L1", 1, None, None, &c)
            .unwrap();
        assert_eq!(a3.shipment_sequence, 1);
        assert_eq!(get_line(&env.conn, "L1").shipment_count, 3);
    }

    // ==========================================
    // 配载计划落库
    // ==========================================

    #[test]
    fn test_apply_plan_materialises_containers_and_records() {
        let env = setup_env();
        seed_source_line(&env.conn, "L1", "PI-1", 20, 500.0, 1.0);
        let c = ctx("planner");
        let shipment = env.ledger.create_shipment("SHP-PLAN", &c).unwrap();
        env.ledger.link_commitment(&shipment.shipment_id, "PI-1", &c).unwrap();

        let units: Vec<PackableUnit> = (1..=10).map(|i| unit(&format!("BOX-{:02}", i), "L1")).collect();
        let plan = env
            .loading
            .plan(AllocationAlgorithm::BestFit, &units, None)
            .unwrap();
        assert!(plan.is_complete());
        assert_eq!(plan.total_containers(), 1);

        let containers = env.ledger.apply_plan(&shipment.shipment_id, &plan, &c).unwrap();
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].type_code, "20GP");
        assert_eq!(containers[0].current_weight, 5000.0);
        assert_eq!(containers[0].current_volume, 10.0);

        let records = AllocationRepository::new(env.conn.clone())
            .list_by_container(&containers[0].container_id)
            .unwrap();
        assert_eq!(records.len(), 10);
        assert!(records.iter().all(|r| r.unit_ref.as_deref().unwrap_or("").starts_with("BOX-")));
        assert_eq!(get_line(&env.conn, "L1").quantity_shipped, 10);
    }

    #[test]
    fn test_apply_plan_is_all_or_nothing() {
        let env = setup_env();
        // 承诺量只够 5 件
        seed_source_line(&env.conn, "L1", "PI-1", 5, 500.0, 1.0);
        let c = ctx("planner");
        let shipment = env.ledger.create_shipment("SHP-ATOM", &c).unwrap();
        env.ledger.link_commitment(&shipment.shipment_id, "PI-1", &c).unwrap();

        let units: Vec<PackableUnit> = (1..=8).map(|i| unit(&format!("BOX-{:02}", i), "L1")).collect();
        let plan = env
            .loading
            .plan(AllocationAlgorithm::BestFit, &units, None)
            .unwrap();

        let err = env.ledger.apply_plan(&shipment.shipment_id, &plan, &c).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(RuleViolation::InsufficientQuantity { .. })
        ));
        assert_eq!(get_line(&env.conn, "L1").quantity_shipped, 0);
        assert!(ContainerRepository::new(env.conn.clone())
            .list_by_shipment(&shipment.shipment_id)
            .unwrap()
            .is_empty());
    }

    // ==========================================
    // 审计
    // ==========================================

    #[test]
    fn test_every_write_is_logged_with_actor() {
        let env = setup_env();
        seed_source_line(&env.conn, "L1", "PI-1", 10, 1.0, 0.01);
        let (shipment_id, container_id) = shipment_with_container(&env, "SHP-LOG");
        env.ledger
            .add_allocation(&container_id, "L1", 2, Some("BOX-1"), None, &ctx("alice"))
            .unwrap();

        let logs = ActionLogRepository::new(env.conn.clone())
            .list_by_shipment(&shipment_id)
            .unwrap();
        let types: Vec<ActionType> = logs.iter().map(|l| l.action_type).collect();
        assert_eq!(
            types,
            vec![
                ActionType::CreateShipment,
                ActionType::LinkCommitment,
                ActionType::CreateContainer,
                ActionType::AddAllocation,
            ]
        );
        assert_eq!(logs.last().unwrap().actor, "alice");
    }
}
