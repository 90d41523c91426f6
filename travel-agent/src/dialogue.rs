//! Dialogue state machine.
//!
//! One call to [`DialogueMachine::step`] handles one turn for one user: it
//! reads the current [`DialogState`], the slots merged so far and the
//! classified intent, calls the travel search when a flow has everything
//! it needs, and leaves the context in the next state. Search failures are
//! answered in the reply and never advance the flow.

use chrono::{Days, NaiveDate, Utc};
use dialogue_core::{
    format_price, reservation_code, BookingKind, DialogState, ExtractedFacts, Intent, PriceStyle,
    UserContext,
};
use std::sync::Arc;
use std::time::Duration;

use crate::error::bounded;
use crate::travel_search::TravelSearch;

/// Days ahead used as the outbound date when the user gave none.
pub const DEFAULT_DEPARTURE_DAYS: u64 = 30;

/// Origin code used when neither the origin nor the default resolves.
const FALLBACK_ORIGIN_CODE: &str = "GRU";

pub const GREETING: &str = "Olá! 👋 Sou seu assistente de viagens.\n\n\
Posso ajudar com:\n\n\
✈️ Voos - Consultar, comprar ou cancelar\n\
🏨 Hotéis - Reservar, consultar ou cancelar\n\n\
O que você precisa hoje?";

const ASK_FLIGHT_DESTINATION: &str = "✈️ Perfeito! Para buscar os melhores voos, preciso saber:\n\n\
📍 Para qual cidade você quer viajar?\n\n\
Exemplo: \"quero voo para Roma\" ou \"voo para Rio de Janeiro\"";

const ASK_FLIGHT_CANCELLATION: &str = "❌ Vou ajudar com o cancelamento do seu voo.\n\n\
Preciso de:\n\
📝 Número da reserva ou localizador\n\
🆔 CPF do titular\n\n\
Por favor, me informe esses dados.";

const ASK_HOTEL_CANCELLATION: &str = "❌ Vou ajudar com o cancelamento da sua reserva de hotel.\n\n\
Preciso de:\n\
📝 Número da reserva\n\
👤 Nome do titular\n\
🆔 CPF\n\n\
Por favor, me informe esses dados.";

const ASK_HOTEL_DETAILS: &str = "🏨 Perfeito! Para buscar os melhores hotéis, preciso saber:\n\n\
📍 Em qual cidade?\n\
📅 Check-in? (DD/MM/YYYY)\n\
📅 Check-out? (DD/MM/YYYY)\n\
👥 Quantas pessoas?\n\n\
Pode enviar tudo em uma mensagem!";

pub struct DialogueMachine {
    search: Arc<dyn TravelSearch>,
    default_origin: String,
    timeout: Duration,
}

impl DialogueMachine {
    pub fn new(search: Arc<dyn TravelSearch>, default_origin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            search,
            default_origin: default_origin.into(),
            timeout,
        }
    }

    /// Advance `ctx` by one turn and return the reply.
    ///
    /// `facts` are this turn's extractions, already merged into `ctx.data`;
    /// they are passed again because a selection index only counts in the
    /// turn it was typed.
    pub async fn step(
        &self,
        ctx: &mut UserContext,
        facts: &ExtractedFacts,
        intent: Option<Intent>,
    ) -> String {
        let from = ctx.state;

        // A new, unrelated request abandons a pending cancellation.
        if from == DialogState::WaitingCancellationInfo && intent.is_some_and(|i| !i.is_cancellation()) {
            tracing::info!("↩ Leaving cancellation intake for {:?}", intent);
            ctx.state = DialogState::Idle;
        }

        let reply = match ctx.state {
            DialogState::Idle => self.on_idle(ctx, intent).await,
            DialogState::WaitingFlightSelection => self.on_flight_selection(ctx, facts),
            DialogState::WaitingPayment => self.on_flight_payment(ctx),
            DialogState::WaitingHotelDetails => self.hotel_flow(ctx, Intent::BookHotel).await,
            DialogState::WaitingHotelPayment => self.on_hotel_payment(ctx, facts),
            DialogState::WaitingCancellationInfo => self.on_cancellation_info(ctx),
        };

        if ctx.state != from {
            tracing::info!("🔀 State {} → {}", from, ctx.state);
        }
        reply
    }

    async fn on_idle(&self, ctx: &mut UserContext, intent: Option<Intent>) -> String {
        match intent {
            Some(intent) if intent.is_flight() => self.flight_flow(ctx, intent).await,
            Some(intent) if intent.is_hotel() => self.hotel_flow(ctx, intent).await,
            _ => GREETING.to_string(),
        }
    }

    async fn flight_flow(&self, ctx: &mut UserContext, intent: Intent) -> String {
        if intent == Intent::CancelFlight {
            ctx.state = DialogState::WaitingCancellationInfo;
            return ASK_FLIGHT_CANCELLATION.to_string();
        }

        let Some(destination) = ctx.data.destination.clone() else {
            return ASK_FLIGHT_DESTINATION.to_string();
        };

        let Some(destination_code) = self.search.resolve_code(&destination) else {
            return format!(
                "🔍 Hmm, não encontrei '{}' no meu sistema.\n\n\
                 Por favor, especifique melhor a cidade.\n\n\
                 Exemplos: Lisboa, Dublin, Paris, Nova York, Rio de Janeiro",
                destination
            );
        };

        let origin = ctx.data.origin.clone().unwrap_or_else(|| self.default_origin.clone());
        let origin_code = self
            .search
            .resolve_code(&origin)
            .or_else(|| self.search.resolve_code(&self.default_origin))
            .unwrap_or_else(|| FALLBACK_ORIGIN_CODE.to_string());
        let departure = ctx.data.outbound_date.unwrap_or_else(default_departure);
        let passengers = ctx.data.passengers.unwrap_or(1);

        let search = self
            .search
            .search_flights(&origin_code, &destination_code, departure, passengers);
        let offers = match bounded("flight search", self.timeout, search).await {
            Ok(offers) => offers,
            Err(e) => {
                tracing::warn!("⚠ Flight search failed for {}: {}", destination_code, e);
                return format!(
                    "😔 Não consegui buscar voos para {} agora.\n\n\
                     Tente novamente em instantes ou escolha outra cidade.",
                    destination
                );
            }
        };

        if offers.is_empty() {
            return format!(
                "😔 Não encontrei voos disponíveis para {} nesta data.\n\n\
                 Posso ajudar com:\n• Outra cidade\n• Outra data\n\nO que prefere?",
                destination
            );
        }

        let found = offers.len();
        ctx.set_flight_offers(offers);

        let mut text = format!(
            "✈️ Encontrei {} voos de {} para {}!\n\n🗓️ Data: {}\n👥 Passageiros: {}\n\n📋 Melhores opções:\n\n",
            found, origin, destination, departure, passengers
        );
        for (i, flight) in ctx.flight_offers.iter().enumerate() {
            text.push_str(&format!(
                "{}. {} - Partida {} - {}",
                i + 1,
                flight.carrier,
                flight.departure_time(),
                format_price(&flight.price, PriceStyle::Listing)
            ));
            let duration = flight.duration_label();
            if !duration.is_empty() {
                text.push_str(&format!(" - {}", duration));
            }
            text.push('\n');
        }

        if intent == Intent::BuyFlight {
            ctx.state = DialogState::WaitingFlightSelection;
            text.push_str("\n\n💳 Para comprar: Digite o número do voo desejado (ex: 1, 2, 3...)");
        } else {
            // A listing ends the request; a later bare place name starts over.
            ctx.last_intent = None;
            text.push_str("\n\n📞 Gostou? Diga 'comprar voo [número]' para prosseguir!");
        }
        text
    }

    fn on_flight_selection(&self, ctx: &mut UserContext, facts: &ExtractedFacts) -> String {
        if ctx.flight_offers.is_empty() {
            ctx.state = DialogState::Idle;
            return "⌛ Não tenho mais as opções de voo desta conversa.\n\n\
                    Me diga o destino novamente para eu refazer a busca."
                .to_string();
        }

        let chosen = facts
            .selection
            .and_then(|index| ctx.flight_at(index).cloned().map(|offer| (index, offer)));
        let Some((index, offer)) = chosen else {
            return format!(
                "Por favor, escolha um voo válido (1 a {}).\n\nDigite apenas o número.",
                ctx.flight_offers.len()
            );
        };

        let price = format_price(&offer.price, PriceStyle::Selection);
        ctx.data.selected_flight = Some(offer);
        ctx.data.selected_flight_index = Some(index);
        ctx.state = DialogState::WaitingPayment;

        format!(
            "✅ Ótima escolha! Voo #{} selecionado.\n\n💰 Valor: {}\n\n\
             📋 Para finalizar, preciso de:\n\n\
             1️⃣ Nome completo do passageiro\n2️⃣ CPF\n3️⃣ Forma de pagamento (crédito/débito/PIX)\n\n\
             Pode enviar tudo em uma mensagem!",
            index, price
        )
    }

    fn on_flight_payment(&self, ctx: &mut UserContext) -> String {
        let Some(flight) = ctx.data.selected_flight.clone() else {
            ctx.state = if ctx.flight_offers.is_empty() {
                DialogState::Idle
            } else {
                DialogState::WaitingFlightSelection
            };
            return "Ainda não sei qual voo você escolheu. Digite o número do voo, \
                    ou me diga o destino para uma nova busca."
                .to_string();
        };

        let data = &ctx.data;
        let (Some(name), Some(national_id), Some(payment)) =
            (data.full_name.clone(), data.national_id.clone(), data.payment_method)
        else {
            return missing_payment_fields(ctx, false);
        };

        let code = reservation_code(BookingKind::Flight, &national_id, Utc::now());
        let reply = format!(
            "🎉 Reserva confirmada com sucesso!\n\n📋 Resumo:\n✈️ Voo #{}\n👤 {}\n🆔 CPF: {}\n💳 {}\n💰 Total: {}\n\n\
             🎫 Número da reserva: {}\n\n\
             ✅ Você receberá a confirmação por e-mail em instantes!\n\n\
             🙏 Obrigado por escolher nossos serviços. Boa viagem!",
            ctx.data.selected_flight_index.unwrap_or(1),
            name,
            national_id,
            payment,
            format_price(&flight.price, PriceStyle::Confirmation),
            code
        );

        tracing::info!("🎫 Flight booking confirmed: {}", code);
        ctx.reset();
        reply
    }

    async fn hotel_flow(&self, ctx: &mut UserContext, intent: Intent) -> String {
        if intent == Intent::CancelHotel {
            return ASK_HOTEL_CANCELLATION.to_string();
        }

        let Some(city) = ctx.data.destination.clone() else {
            ctx.state = DialogState::WaitingHotelDetails;
            return ASK_HOTEL_DETAILS.to_string();
        };

        let (Some(check_in), Some(check_out)) = (ctx.data.check_in, ctx.data.check_out) else {
            ctx.state = DialogState::WaitingHotelDetails;
            let party = if ctx.data.passengers.is_none() { "\n👥 Número de pessoas" } else { "" };
            return format!(
                "Ótimo! Hotel em {}.\n\nAinda preciso de:\n\n\
                 📅 Data check-in (DD/MM/YYYY)\n📅 Data check-out (DD/MM/YYYY){}\n\n\
                 💡 Envie as datas em uma mensagem!",
                city, party
            );
        };

        if check_out <= check_in {
            ctx.state = DialogState::WaitingHotelDetails;
            return format!(
                "📅 O check-out ({}) precisa ser depois do check-in ({}).\n\n\
                 Envie as duas datas novamente, por favor.",
                check_out, check_in
            );
        }

        let guests = *ctx.data.passengers.get_or_insert(1);

        let Some(city_code) = self.search.resolve_code(&city) else {
            return format!(
                "🔍 Não encontrei '{}' no sistema.\n\nTente: Lisboa, Paris, Dublin, Nova York, Rio de Janeiro...",
                city
            );
        };

        let search = self.search.search_hotels(&city_code, check_in, check_out, 1);
        let offers = match bounded("hotel search", self.timeout, search).await {
            Ok(offers) => offers,
            Err(e) => {
                tracing::warn!("⚠ Hotel search failed for {}: {}", city_code, e);
                return format!("❌ Erro: {}\n\nTente:\n• Outra cidade\n• Outras datas", e);
            }
        };

        if offers.is_empty() {
            return format!(
                "😔 Não encontrei hotéis disponíveis em {} para essas datas.\n\n\
                 Posso ajudar com:\n• Outra cidade\n• Outras datas",
                city
            );
        }

        let found = offers.len();
        ctx.set_hotel_offers(offers);

        let mut text = format!(
            "🏨 Encontrei {} hotéis em {}!\n\n📅 {} até {}\n👥 {} pessoa(s)\n\n🏆 Melhores opções:\n\n",
            found, city, check_in, check_out, guests
        );
        for (i, hotel) in ctx.hotel_offers.iter().enumerate() {
            text.push_str(&format!(
                "{}. {}\n   {}\n\n",
                i + 1,
                hotel.name,
                format_price(&hotel.price, PriceStyle::Nightly)
            ));
        }

        if intent == Intent::BookHotel {
            ctx.state = DialogState::WaitingHotelPayment;
            text.push_str(
                "💳 Para reservar: Digite o número do hotel\n\nDepois precisarei de: nome, CPF e forma de pagamento",
            );
        } else {
            ctx.last_intent = None;
            text.push_str("📞 Gostou? Diga 'reservar hotel [número]'");
        }
        text
    }

    fn on_hotel_payment(&self, ctx: &mut UserContext, facts: &ExtractedFacts) -> String {
        if let Some(index) = facts.selection {
            if let Some(hotel) = ctx.hotel_at(index).cloned() {
                ctx.data.selected_hotel = Some(hotel);
                ctx.data.selected_hotel_index = Some(index);
            }
        }

        let Some(hotel) = ctx.data.selected_hotel.clone() else {
            if ctx.hotel_offers.is_empty() {
                ctx.state = DialogState::Idle;
                return "⌛ Não tenho mais as opções de hotel desta conversa.\n\n\
                        Me diga a cidade e as datas novamente para eu refazer a busca."
                    .to_string();
            }
            return format!(
                "Por favor, escolha um hotel (1 a {}).\n\nDigite o número.",
                ctx.hotel_offers.len()
            );
        };

        let data = &ctx.data;
        let (Some(name), Some(national_id), Some(payment)) =
            (data.full_name.clone(), data.national_id.clone(), data.payment_method)
        else {
            return missing_payment_fields(ctx, true);
        };

        let code = reservation_code(BookingKind::Hotel, &national_id, Utc::now());
        let show_date = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "—".to_string());
        let reply = format!(
            "🎉 Reserva confirmada com sucesso!\n\n📋 Resumo:\n🏨 {}\n📍 {}\n📅 {} até {}\n👥 {} pessoa(s)\n\n\
             👤 {}\n🆔 {}\n💳 {}\n💰 Total: {}\n\n🎫 Número da reserva: {}\n\n\
             ✅ Confirmação enviada por e-mail!\n\n🙏 Ótima estadia!",
            hotel.name,
            ctx.data.destination.as_deref().unwrap_or("—"),
            show_date(ctx.data.check_in),
            show_date(ctx.data.check_out),
            ctx.data.passengers.unwrap_or(1),
            name,
            national_id,
            payment,
            format_price(&hotel.price, PriceStyle::StayTotal),
            code
        );

        tracing::info!("🎫 Hotel booking confirmed: {}", code);
        ctx.reset();
        reply
    }

    fn on_cancellation_info(&self, ctx: &mut UserContext) -> String {
        let Some(national_id) = ctx.data.national_id.clone() else {
            return "Para cancelar, preciso do 🆔 CPF do titular e, se tiver, do 📝 número da reserva.".to_string();
        };

        let reservation = ctx
            .data
            .reservation_code
            .clone()
            .unwrap_or_else(|| "não informado".to_string());
        tracing::info!("📝 Flight cancellation request recorded ({})", reservation);
        ctx.reset();

        format!(
            "✅ Pedido de cancelamento registrado!\n\n🆔 CPF: {}\n📝 Reserva: {}\n\n\
             Você receberá a confirmação do cancelamento por e-mail.",
            national_id, reservation
        )
    }
}

fn default_departure() -> NaiveDate {
    let today = Utc::now().date_naive();
    today
        .checked_add_days(Days::new(DEFAULT_DEPARTURE_DAYS))
        .unwrap_or(today)
}

fn missing_payment_fields(ctx: &UserContext, hotel: bool) -> String {
    let mut missing = Vec::new();
    if ctx.data.full_name.is_none() {
        missing.push("👤 Nome completo");
    }
    if ctx.data.national_id.is_none() {
        missing.push("🆔 CPF");
    }
    if ctx.data.payment_method.is_none() {
        missing.push(if hotel {
            "💳 Forma de pagamento (crédito/débito/PIX)"
        } else {
            "💳 Forma de pagamento"
        });
    }
    let closing = if hotel {
        "Envie tudo em uma mensagem!"
    } else {
        "Envie tudo em uma mensagem para agilizar!"
    };
    format!("Quase lá! Ainda preciso de:\n\n{}\n\n{}", missing.join("\n"), closing)
}
