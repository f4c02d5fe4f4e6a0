//! Holds the bus, repositories and services for one node.

use std::sync::Arc;

use api_gateway::{
    DomainServices, InMemoryMenuRepository, InMemoryOrderRepository, InMemoryPageRepository,
    InMemoryParamsRepository, MenuService, OrderService, PageService, ParamsService,
};
use shared_bus::{ChangeNotifier, EventPublisher, NotificationBus};
use tracing::{info, instrument};

use crate::container::config::NodeConfig;
use crate::seed::{self, SeedError};

/// Central container holding all service instances.
pub struct ServiceContainer {
    /// Bus carrying change notifications to WebSocket sessions.
    pub bus: Arc<NotificationBus>,

    /// Order storage.
    pub order_repo: Arc<InMemoryOrderRepository>,

    /// Menu storage.
    pub menu_repo: Arc<InMemoryMenuRepository>,

    /// Content page storage.
    pub page_repo: Arc<InMemoryPageRepository>,

    /// Site parameters and settings.
    pub params_repo: Arc<InMemoryParamsRepository>,

    pub orders: OrderService,
    pub menu: MenuService,
    pub pages: PageService,
    pub params: ParamsService,

    /// Node configuration (immutable after initialization).
    pub config: NodeConfig,
}

impl ServiceContainer {
    /// Create the bus, repositories and services, and load the initial menu.
    #[instrument(name = "container_init", skip(config))]
    pub fn new(config: NodeConfig) -> Result<Self, SeedError> {
        let bus = Arc::new(NotificationBus::new());
        let notifier = ChangeNotifier::new(Arc::clone(&bus) as Arc<dyn EventPublisher>);

        let order_repo = Arc::new(InMemoryOrderRepository::new());
        let menu_repo = Arc::new(InMemoryMenuRepository::new());
        let page_repo = Arc::new(InMemoryPageRepository::new());
        let params_repo = Arc::new(InMemoryParamsRepository::new());

        let menus = seed::initial_menus(&config.seed)?;
        let products: usize = menus
            .iter()
            .flat_map(|m| &m.groups)
            .map(|g| g.products.len())
            .sum();
        for menu in menus {
            menu_repo.load_menu(menu);
        }
        info!(products, "Menu loaded");

        let orders = OrderService::new(
            order_repo.clone(),
            menu_repo.clone(),
            notifier.clone(),
        );
        let menu = MenuService::new(menu_repo.clone(), notifier);
        let pages = PageService::new(page_repo.clone());
        let params = ParamsService::new(params_repo.clone());

        Ok(Self {
            bus,
            order_repo,
            menu_repo,
            page_repo,
            params_repo,
            orders,
            menu,
            pages,
            params,
            config,
        })
    }

    /// Services handed to the gateway.
    pub fn services(&self) -> DomainServices {
        DomainServices {
            orders: self.orders.clone(),
            menu: self.menu.clone(),
            pages: self.pages.clone(),
            params: self.params.clone(),
        }
    }
}
