// ==========================================
// 生命周期 API 集成测试
// ==========================================
// 职责: 验证施封/解封、出运单确认/取消、发运/交付的前置条件与级联效果
// ==========================================


#[cfg(test)]
mod lifecycle_api_test {
    use container_loading::repository::{
        ActionLogRepository, ContainerRepository, RepositoryError, ShipmentRepository,
        SourceLineRepository,
    };
    use container_loading::{
        ActionType, ApiError, ConcurrencyConflict, ContainerStatus, FulfillmentStatus,
        RuleViolation, ShipmentStatus,
    };

    use crate::test_helpers::{ctx, get_line, seed_source_line, setup_env, TestEnv};

    /// 出运单(已关联 PI-1) + 一个 20GP
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

    /// 配载 -> 装箱 -> 施封
    fn load_and_seal(env: &TestEnv, container_id: &str, line: &str, quantity: i64, seal: &str) {
        let c = ctx("loader");
        env.ledger
            .add_allocation(container_id, line, quantity, None, None, &c)
            .unwrap();
        env.ledger.mark_packed(container_id, &c).unwrap();
        env.lifecycle.seal(container_id, seal, &c).unwrap();
    }

    fn container_status(env: &TestEnv, container_id: &str) -> ContainerStatus {
        ContainerRepository::new(env.conn.clone())
            .find_by_id(container_id)
            .unwrap()
            .unwrap()
            .status
    }

    // ==========================================
    // 施封
    // ==========================================

    #[test]
    fn test_seal_empty_container_is_rejected() {
        let env = setup_env();
        let (_, container_id) = shipment_with_container(&env, "SHP-EMPTY");

        let err = env
            .lifecycle
            .seal(&container_id, "SEAL-0001", &ctx("loader"))
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(RuleViolation::EmptyContainer { .. })
        ));
        assert_eq!(container_status(&env, &container_id), ContainerStatus::Draft);
    }

    #[test]
    fn test_seal_requires_packed_records() {
        let env = setup_env();
        seed_source_line(&env.conn, "L1", "PI-1", 100, 10.0, 0.1);
        let (_, container_id) = shipment_with_container(&env, "SHP-UNPK");
        let c = ctx("loader");
        env.ledger
            .add_allocation(&container_id, "L1", 10, None, None, &c)
            .unwrap();

        let err = env.lifecycle.seal(&container_id, "SEAL-0002", &c).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(RuleViolation::UnpackedItems { count: 1, .. })
        ));

        env.ledger.mark_packed(&container_id, &c).unwrap();
        let sealed = env.lifecycle.seal(&container_id, " SEAL-0002 ", &c).unwrap();
        assert_eq!(sealed.status, ContainerStatus::Sealed);
        assert_eq!(sealed.seal_number.as_deref(), Some("SEAL-0002"));
        assert_eq!(sealed.sealed_by.as_deref(), Some("loader"));
    }

    #[test]
    fn test_seal_number_must_be_unique() {
        let env = setup_env();
        seed_source_line(&env.conn, "L1", "PI-1", 100, 10.0, 0.1);
        let (_, first) = shipment_with_container(&env, "SHP-DUP1");
        let (_, second) = shipment_with_container(&env, "SHP-DUP2");

        load_and_seal(&env, &first, "L1", 5, "SEAL-DUP");

        let c = ctx("loader");
        env.ledger.add_allocation(&second, "L1", 5, None, None, &c).unwrap();
        env.ledger.mark_packed(&second, &c).unwrap();
        let err = env.lifecycle.seal(&second, "SEAL-DUP", &c).unwrap_err();
        match err {
            ApiError::Validation(RuleViolation::DuplicateSealNumber { seal_number }) => {
                assert_eq!(seal_number, "SEAL-DUP");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(container_status(&env, &second), ContainerStatus::Packed);
    }

    #[test]
    fn test_blank_seal_number_is_invalid() {
        let env = setup_env();
        let (_, container_id) = shipment_with_container(&env, "SHP-BLANK");
        let err = env.lifecycle.seal(&container_id, "   ", &ctx("loader")).unwrap_err();
        assert!(matches!(err, ApiError::Validation(RuleViolation::InvalidInput(_))));
    }

    #[test]
    fn test_sealed_container_rejects_allocation_changes() {
        let env = setup_env();
        seed_source_line(&env.conn, "L1", "PI-1", 100, 10.0, 0.1);
        let (_, container_id) = shipment_with_container(&env, "SHP-LOCK");
        load_and_seal(&env, &container_id, "L1", 5, "SEAL-LOCK");

        let err = env
            .ledger
            .add_allocation(&container_id, "L1", 1, None, None, &ctx("loader"))
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(RuleViolation::ContainerNotMutable { .. })
        ));
        assert_eq!(get_line(&env.conn, "L1").quantity_shipped, 5);
    }

    // ==========================================
    // 解封
    // ==========================================

    #[test]
    fn test_unseal_only_while_preparing_and_frees_seal_number() {
        let env = setup_env();
        seed_source_line(&env.conn, "L1", "PI-1", 100, 10.0, 0.1);
        let (shipment_id, container_id) = shipment_with_container(&env, "SHP-UNS");
        load_and_seal(&env, &container_id, "L1", 5, "SEAL-UNS");
        let c = ctx("supervisor");

        // DRAFT 出运单不可解封
        let err = env.lifecycle.unseal(&container_id, &c).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(RuleViolation::ShipmentNotMutable { .. })
        ));

        env.lifecycle.start_preparing(&shipment_id, &c).unwrap();
        let unsealed = env.lifecycle.unseal(&container_id, &c).unwrap();
        assert_eq!(unsealed.status, ContainerStatus::Packed);
        assert!(unsealed.seal_number.is_none());

        // 封条号可被再次使用
        let resealed = env.lifecycle.seal(&container_id, "SEAL-UNS", &c).unwrap();
        assert_eq!(resealed.status, ContainerStatus::Sealed);
    }

    // ==========================================
    // 确认 / 发运 / 交付
    // ==========================================

    #[test]
    fn test_confirm_marks_lines_and_freezes_shipment() {
        let env = setup_env();
        seed_source_line(&env.conn, "L1", "PI-1", 10, 10.0, 0.1);
        seed_source_line(&env.conn, "L2", "PI-1", 100, 5.0, 0.05);
        let (shipment_id, container_id) = shipment_with_container(&env, "SHP-OK");
        let c = ctx("supervisor");

        env.ledger.plan_line(&shipment_id, "L1", 10, &c).unwrap();
        env.ledger.plan_line(&shipment_id, "L2", 30, &c).unwrap();
        env.ledger.add_allocation(&container_id, "L1", 10, None, None, &c).unwrap();
        env.ledger.add_allocation(&container_id, "L2", 30, None, None, &c).unwrap();
        env.ledger.mark_packed(&container_id, &c).unwrap();
        env.lifecycle.seal(&container_id, "SEAL-OK", &c).unwrap();
        env.lifecycle.start_preparing(&shipment_id, &c).unwrap();

        let summary = env.lifecycle.confirm(&shipment_id, &c).unwrap();
        assert_eq!(summary.shipment.status, ShipmentStatus::Confirmed);
        assert_eq!(summary.shipment.confirmed_by.as_deref(), Some("supervisor"));
        assert_eq!(summary.lines.len(), 2);
        assert_eq!(summary.lines[0].source_line_id, "L1");
        assert_eq!(summary.lines[0].status, FulfillmentStatus::FullyShipped);
        assert_eq!(summary.lines[1].source_line_id, "L2");
        assert_eq!(summary.lines[1].status, FulfillmentStatus::PartialShipped);

        let stored = ShipmentRepository::new(env.conn.clone())
            .find_by_id(&shipment_id)
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ShipmentStatus::Confirmed);

        // 确认后不可再变更配载
        let err = env
            .ledger
            .add_allocation(&container_id, "L2", 1, None, None, &c)
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(RuleViolation::ShipmentNotMutable { .. })
        ));

        let dispatched = env.lifecycle.dispatch(&container_id, &c).unwrap();
        assert_eq!(dispatched.status, ContainerStatus::InTransit);
        let delivered = env.lifecycle.deliver(&container_id, &c).unwrap();
        assert_eq!(delivered.status, ContainerStatus::Delivered);
    }

    #[test]
    fn test_confirm_rejects_unsealed_container() {
        let env = setup_env();
        seed_source_line(&env.conn, "L1", "PI-1", 100, 10.0, 0.1);
        let (shipment_id, sealed) = shipment_with_container(&env, "SHP-UNSEALED");
        load_and_seal(&env, &sealed, "L1", 5, "SEAL-A");
        let c = ctx("supervisor");
        let open = env.ledger.create_container(&shipment_id, "20GP", &c).unwrap();
        env.ledger
            .add_allocation(&open.container_id, "L1", 5, None, None, &c)
            .unwrap();
        env.lifecycle.start_preparing(&shipment_id, &c).unwrap();

        let err = env.lifecycle.confirm(&shipment_id, &c).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(RuleViolation::UnsealedContainers { count: 1, .. })
        ));
    }

    #[test]
    fn test_confirm_rejects_shipment_without_containers() {
        let env = setup_env();
        let c = ctx("supervisor");
        let shipment = env.ledger.create_shipment("SHP-NONE", &c).unwrap();
        env.lifecycle.start_preparing(&shipment.shipment_id, &c).unwrap();

        let err = env.lifecycle.confirm(&shipment.shipment_id, &c).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(RuleViolation::NoContainers { .. })
        ));
    }

    #[test]
    fn test_confirm_rejects_unallocated_planned_units() {
        let env = setup_env();
        seed_source_line(&env.conn, "L1", "PI-1", 100, 10.0, 0.1);
        let (shipment_id, container_id) = shipment_with_container(&env, "SHP-SHORT");
        let c = ctx("supervisor");
        env.ledger.plan_line(&shipment_id, "L1", 20, &c).unwrap();
        load_and_seal(&env, &container_id, "L1", 12, "SEAL-SHORT");
        env.lifecycle.start_preparing(&shipment_id, &c).unwrap();

        let err = env.lifecycle.confirm(&shipment_id, &c).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(RuleViolation::UnallocatedUnits { count: 8, .. })
        ));
    }

    #[test]
    fn test_confirm_from_draft_is_illegal() {
        let env = setup_env();
        seed_source_line(&env.conn, "L1", "PI-1", 100, 10.0, 0.1);
        let (shipment_id, container_id) = shipment_with_container(&env, "SHP-DRAFT");
        load_and_seal(&env, &container_id, "L1", 5, "SEAL-DRAFT");

        let err = env.lifecycle.confirm(&shipment_id, &ctx("supervisor")).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(RuleViolation::IllegalTransition { .. })
        ));
    }

    #[test]
    fn test_dispatch_requires_confirmed_shipment() {
        let env = setup_env();
        seed_source_line(&env.conn, "L1", "PI-1", 100, 10.0, 0.1);
        let (_, container_id) = shipment_with_container(&env, "SHP-EARLY");
        load_and_seal(&env, &container_id, "L1", 5, "SEAL-EARLY");

        let err = env.lifecycle.dispatch(&container_id, &ctx("driver")).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(RuleViolation::IllegalTransition { .. })
        ));
        assert_eq!(container_status(&env, &container_id), ContainerStatus::Sealed);
    }

    #[test]
    fn test_confirm_detects_commitment_consumed_elsewhere() {
        let env = setup_env();
        seed_source_line(&env.conn, "L1", "PI-1", 100, 10.0, 0.1);
        let (shipment_id, container_id) = shipment_with_container(&env, "SHP-RACE");
        load_and_seal(&env, &container_id, "L1", 80, "SEAL-RACE");
        let c = ctx("supervisor");
        env.lifecycle.start_preparing(&shipment_id, &c).unwrap();

        // 外部数据漂移: 绕过仓储直接改写承诺量
        {
            let conn = env.conn.lock().unwrap();
            conn.execute(
                "UPDATE source_line SET quantity = 50 WHERE source_line_id = 'L1'",
                [],
            )
            .unwrap();
        }

        let err = env.lifecycle.confirm(&shipment_id, &c).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Concurrency(ConcurrencyConflict::CommitmentConsumed {
                allocated_here: 80,
                available: 50,
                ..
            })
        ));

        let stored = ShipmentRepository::new(env.conn.clone())
            .find_by_id(&shipment_id)
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ShipmentStatus::Preparing);
        let logs = ActionLogRepository::new(env.conn.clone());
        assert_eq!(logs.count_by_type(&shipment_id, ActionType::Confirm).unwrap(), 0);
    }

    #[test]
    fn test_amend_below_shipped_is_rejected() {
        let env = setup_env();
        seed_source_line(&env.conn, "L1", "PI-1", 100, 10.0, 0.1);
        let (shipment_id, container_id) = shipment_with_container(&env, "SHP-AMEND");
        load_and_seal(&env, &container_id, "L1", 80, "SEAL-AMEND");

        {
            let conn = env.conn.lock().unwrap();
            let err = SourceLineRepository::amend_quantity_with(&conn, "L1", 50).unwrap_err();
            assert!(matches!(err, RepositoryError::FieldValueError { .. }));
            let missing = SourceLineRepository::amend_quantity_with(&conn, "L9", 50).unwrap_err();
            assert!(matches!(missing, RepositoryError::NotFound { .. }));
        }
        let line = get_line(&env.conn, "L1");
        assert_eq!(line.quantity, 100);
        assert_eq!(line.revision, 1);
        assert_eq!(line.quantity_remaining(), 20);

        // 下调到恰好等于已配载量是允许的, 确认后行即发完
        {
            let conn = env.conn.lock().unwrap();
            SourceLineRepository::amend_quantity_with(&conn, "L1", 80).unwrap();
        }
        let line = get_line(&env.conn, "L1");
        assert_eq!(line.revision, 2);
        assert_eq!(line.quantity_remaining(), 0);

        let c = ctx("supervisor");
        env.lifecycle.start_preparing(&shipment_id, &c).unwrap();
        let summary = env.lifecycle.confirm(&shipment_id, &c).unwrap();
        assert_eq!(summary.lines[0].status, FulfillmentStatus::FullyShipped);
    }

    // ==========================================
    // 取消
    // ==========================================

    #[test]
    fn test_cancel_cascades_and_restores_quantity() {
        let env = setup_env();
        seed_source_line(&env.conn, "L1", "PI-1", 100, 10.0, 0.1);
        let (shipment_id, sealed) = shipment_with_container(&env, "SHP-CXL");
        load_and_seal(&env, &sealed, "L1", 30, "SEAL-CXL");
        let c = ctx("supervisor");
        let open = env.ledger.create_container(&shipment_id, "40GP", &c).unwrap();
        env.ledger
            .add_allocation(&open.container_id, "L1", 20, None, None, &c)
            .unwrap();
        env.ledger
            .add_allocation(&open.container_id, "L1", 10, None, None, &c)
            .unwrap();
        assert_eq!(get_line(&env.conn, "L1").quantity_remaining(), 40);

        let summary = env.lifecycle.cancel(&shipment_id, "客户取消订单", &c).unwrap();
        assert_eq!(summary.containers_removed, 2);
        assert_eq!(summary.records_removed, 3);

        let line = get_line(&env.conn, "L1");
        assert_eq!(line.quantity_shipped, 0);
        assert_eq!(line.quantity_remaining(), 100);
        assert!(ContainerRepository::new(env.conn.clone())
            .list_by_shipment(&shipment_id)
            .unwrap()
            .is_empty());

        let stored = ShipmentRepository::new(env.conn.clone())
            .find_by_id(&shipment_id)
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ShipmentStatus::Cancelled);
        assert_eq!(stored.cancel_reason.as_deref(), Some("客户取消订单"));

        // 封条号随实箱删除而释放
        let (_, other) = shipment_with_container(&env, "SHP-CXL2");
        load_and_seal(&env, &other, "L1", 1, "SEAL-CXL");

        let err = env.lifecycle.cancel(&shipment_id, "重复取消", &c).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(RuleViolation::IllegalTransition { .. })
        ));
    }

    #[test]
    fn test_confirmed_shipment_cannot_be_cancelled() {
        let env = setup_env();
        seed_source_line(&env.conn, "L1", "PI-1", 100, 10.0, 0.1);
        let (shipment_id, container_id) = shipment_with_container(&env, "SHP-FINAL");
        load_and_seal(&env, &container_id, "L1", 10, "SEAL-FINAL");
        let c = ctx("supervisor");
        env.lifecycle.start_preparing(&shipment_id, &c).unwrap();
        env.lifecycle.confirm(&shipment_id, &c).unwrap();

        let err = env.lifecycle.cancel(&shipment_id, "太晚了", &c).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation(RuleViolation::IllegalTransition { .. })
        ));
        assert_eq!(get_line(&env.conn, "L1").quantity_shipped, 10);
    }
}
