//! Parametros de configuracion de la maquina de cafe

/// Intervalo del tick del worker mientras hay un pedido en preparacion
pub const WORKER_TICK_MS: u64 = 100;

/// Espera del worker cuando no hay pedidos para atender
pub const IDLE_WAIT_MS: u64 = 2000;

/// Pausa del worker luego de completar un pedido
pub const SETTLE_WAIT_MS: u64 = 2000;

/// Espera del worker luego de un error en un ciclo antes de reintentar
pub const ERROR_BACKOFF_MS: u64 = 1000;

/// Intervalo del log periodico de estado de la maquina
pub const STATUS_LOG_INTERVAL_MS: u64 = 60_000;

/// Factor del techo duro de preparacion: un pedido se abandona si tarda
/// mas de este multiplo de su tiempo de preparacion
pub const MAX_PROCESSING_FACTOR: u32 = 3;

/// Minutos de atraso a partir de los cuales una reserva pendiente
/// se convierte en pedido inmediato
pub const VERY_LATE_RESERVATION_MINUTES: i64 = 30;

/// Cuanto hacia atras mira el worker al elegir una reserva para atender
pub const PICKUP_WINDOW_PAST_MINUTES: i64 = 30;

/// Cuanto hacia adelante mira el worker al elegir una reserva para atender.
/// Es tambien la ventana en la que el worker espera antes de arrancar una
/// reserva para que el cafe salga recien hecho.
pub const PICKUP_WINDOW_FUTURE_MINUTES: i64 = 5;

/// Horizonte de la admision: las reservas con retiro mas alla de este limite
/// no suman al tiempo de espera estimado de una reserva nueva
pub const ADMISSION_HORIZON_MINUTES: i64 = 30;

/// Grilla de redondeo para las sugerencias de la admision y las franjas disponibles
pub const ADMISSION_GRID_MINUTES: u32 = 15;

/// Grilla de redondeo para la proxima franja sugerida de la cola
pub const NEXT_SLOT_GRID_MINUTES: u32 = 5;

/// Cantidad de franjas candidatas que se examinan al listar disponibilidad
pub const SLOT_CANDIDATE_COUNT: u32 = 32;

/// Paso entre franjas candidatas
pub const SLOT_STEP_MINUTES: i64 = 15;

/// Hora de apertura para las franjas candidatas
pub const OPEN_HOUR: u32 = 8;

/// Hora de cierre para las franjas candidatas
pub const CLOSE_HOUR: u32 = 18;

/// Ventana minima de deteccion de superposicion entre reservas, en segundos.
/// La ventana efectiva es el maximo entre este valor y el tiempo de
/// preparacion del cafe pedido.
pub const MIN_OVERLAP_BUFFER_SECONDS: i64 = 30;

/// Separacion que se agrega al proponer una franja despues de un conflicto.
/// Es un margen distinto al de deteccion.
pub const POST_CONFLICT_SPACING_SECONDS: i64 = 60;

/// Tiempo maximo de preparacion que acepta el menu, en segundos
pub const MAX_PREPARATION_SECONDS: u32 = 3600;

/// Largo maximo del nombre del cliente
pub const MAX_CUSTOMER_NAME_CHARS: usize = 255;

/// Nombre de cliente que se usa cuando el pedido no trae uno
pub const DEFAULT_CUSTOMER_NAME: &str = "Client";

/// Cada cuanto avance de progreso se deja registro en el log
pub const PROGRESS_LOG_STEP: u8 = 20;

/// Cantidad de reservas proximas que muestra el log de estado
pub const UPCOMING_RESERVATIONS_PREVIEW: usize = 5;
